use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
	/// An option is out of range. This is raised when a model is constructed.
	#[error("invalid configuration: {0}")]
	Configuration(String),
	/// An instance was rejected. The model is left unchanged.
	#[error("invalid instance: {0}")]
	InvalidInstance(String),
}
