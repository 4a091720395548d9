//! Error taxonomy for registration and loading
//!
//! Navigation calls never surface these to their caller; they are logged at the
//! point of failure and the operation is abandoned. Registration errors are
//! returned synchronously because they indicate a broken view table.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavError {
    /// A descriptor with this name is already registered
    #[error("view '{0}' is already registered")]
    DuplicateName(String),

    /// No descriptor is registered under this name
    #[error("view '{0}' is not registered")]
    NotFound(String),

    /// A child descriptor names a parent that was never registered
    #[error("view '{child}' declares unknown parent '{parent}'")]
    UnknownParent { child: String, parent: String },

    /// An externally supplied node was expected under the parent but is absent
    #[error("view '{view}' expects a pre-placed node under '{parent}', none found")]
    MissingSceneNode { view: String, parent: String },

    /// The asset loader yielded no node for the resource key
    #[error("asset '{resource}' for view '{view}' could not be loaded")]
    AssetUnavailable { view: String, resource: String },

    /// Neither a native nor a scripted controller could be created
    #[error("no controller could be created for view '{0}'")]
    NoController(String),
}

pub type NavResult<T> = std::result::Result<T, NavError>;
