use crate::error::IdentityError;
use std::collections::HashSet;

/// Set of `test_id`s registered during one run.
///
/// Created at run start and handed to case construction; nothing about it
/// outlives the run.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    seen: HashSet<String>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `test_id`, failing if it was registered before.
    pub fn register(
        &mut self,
        test_id: &str,
    ) -> Result<(), IdentityError> {
        if !self.seen.insert(test_id.to_string()) {
            return Err(IdentityError::Duplicate(test_id.to_string()));
        }
        Ok(())
    }

    pub fn contains(
        &self,
        test_id: &str,
    ) -> bool {
        self.seen.contains(test_id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_registration_fails() {
        let mut registry = IdentityRegistry::new();
        registry.register("Hydro/case_1").unwrap();
        assert_eq!(
            registry.register("Hydro/case_1"),
            Err(IdentityError::Duplicate("Hydro/case_1".into()))
        );
        registry.clear();
        assert!(registry.register("Hydro/case_1").is_ok());
    }
}
