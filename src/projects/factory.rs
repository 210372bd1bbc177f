//! Type-polymorphic handler dispatch via a registry validated at construction.
//!
//! The original dynamic-dispatch factory (register/unregister/validate/
//! instantiate, keyed by a type enum) becomes a closed sum `{Crawling, Data,
//! Storage}` plus a map from variant to handler instance, built once and
//! checked for completeness before it is ever used to dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use super::crawling::CrawlingHandler;
use super::data::DataHandler;
use super::storage::StorageHandler;
use super::ProjectHandler;
use crate::error::DocBroError;
use crate::types::ProjectType;

/// Holds one handler instance per [`ProjectType`], validated at construction
/// to guarantee every variant is present and reports the type it claims to.
pub struct ProjectHandlerFactory {
	handlers: HashMap<ProjectType, Arc<dyn ProjectHandler>>,
}

impl ProjectHandlerFactory {
	/// Builds the factory with the three built-in handlers, asserting that
	/// every [`ProjectType`] variant resolves to a handler that reports the
	/// matching type. Mirrors the original factory's startup self-check.
	pub fn new() -> Result<Self, DocBroError> {
		let mut handlers: HashMap<ProjectType, Arc<dyn ProjectHandler>> = HashMap::new();
		handlers.insert(ProjectType::Crawling, Arc::new(CrawlingHandler::default()));
		handlers.insert(ProjectType::Data, Arc::new(DataHandler::default()));
		handlers.insert(ProjectType::Storage, Arc::new(StorageHandler::default()));

		let factory = ProjectHandlerFactory { handlers };
		factory.validate_registrations()?;
		Ok(factory)
	}

	fn validate_registrations(&self) -> Result<(), DocBroError> {
		for variant in ProjectType::ALL {
			match self.handlers.get(&variant) {
				Some(handler) if handler.project_type() == variant => {}
				Some(_) => {
					return Err(DocBroError::Other {
						message: format!("handler registered for {} reports a different type", variant),
					})
				}
				None => {
					return Err(DocBroError::Other { message: format!("no handler registered for {}", variant) })
				}
			}
		}
		Ok(())
	}

	pub fn get(&self, project_type: ProjectType) -> Arc<dyn ProjectHandler> {
		self.handlers
			.get(&project_type)
			.cloned()
			.unwrap_or_else(|| panic!("factory invariant violated: missing handler for {}", project_type))
	}

	/// Number of registered handlers and whether every `ProjectType` variant
	/// is covered; exposed for diagnostics, mirroring the original status introspection.
	pub fn status(&self) -> (usize, bool) {
		(self.handlers.len(), self.validate_registrations().is_ok())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn factory_covers_every_project_type() {
		let factory = ProjectHandlerFactory::new().unwrap();
		for variant in ProjectType::ALL {
			assert_eq!(factory.get(variant).project_type(), variant);
		}
	}

	#[test]
	fn status_reports_full_coverage() {
		let factory = ProjectHandlerFactory::new().unwrap();
		assert_eq!(factory.status(), (3, true));
	}
}
