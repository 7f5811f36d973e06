use std::any::Any;

use crate::{
    class::{ClassId, Object},
    engine::MigrationEngine,
    error::{MigrationError, Result},
    options::Options,
    version_tag::VersionTag,
};

/// Converter bound to one target version and one options bag, for callers
/// that always need the same representation (e.g. one part of a resource).
#[derive(Debug, Clone)]
pub struct VersionConverter {
    engine: MigrationEngine,
    target: VersionTag,
    options: Options,
}

impl VersionConverter {
    pub fn new(engine: MigrationEngine, target: VersionTag, options: Options) -> Self {
        Self {
            engine,
            target,
            options,
        }
    }

    /// Targets the version declared by `T`.
    pub fn for_type<T: Any>(engine: MigrationEngine, options: Options) -> Result<Self> {
        let target = engine.registry().version_of(ClassId::of::<T>())?;
        Ok(Self::new(engine, target, options))
    }

    pub fn target(&self) -> &VersionTag {
        &self.target
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Brings `object` to the bound version.
    pub fn migrate_from(&self, object: Object) -> Result<Object> {
        self.engine.convert(object, &self.target, &self.options)
    }

    /// Same as `migrate_from`, unwrapping the result as `T`.
    pub fn migrate_into<T: Any>(&self, object: Object) -> Result<T> {
        self.migrate_from(object)?
            .downcast::<T>()
            .map_err(|object| MigrationError::TypeMismatch {
                expected: ClassId::of::<T>(),
                found: object.class(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metadata::StaticMetadata, migration::MigrationDeclaration, registry::MigrationRegistry};
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    struct PriceV1 {
        cents: u64,
    }

    #[derive(Debug, PartialEq)]
    struct PriceV2 {
        amount: String,
        currency: String,
    }

    fn engine() -> MigrationEngine {
        let metadata = StaticMetadata::new()
            .class::<PriceV1>("vnd.test.price.v1")
            .class::<PriceV2>("vnd.test.price.v2")
            .migration(MigrationDeclaration::from::<PriceV1, PriceV2, _>("fromV1", |v1, options| {
                Ok(PriceV2 {
                    amount: format!("{}.{:02}", v1.cents / 100, v1.cents % 100),
                    currency: options.get_str("currency").unwrap_or("EUR").to_string(),
                })
            }));
        MigrationEngine::new(Arc::new(MigrationRegistry::new(metadata)))
    }

    #[test]
    fn test_converter_uses_bound_options() {
        let converter = VersionConverter::for_type::<PriceV2>(engine(), Options::new().with("currency", "USD")).unwrap();
        assert_eq!(converter.target(), &VersionTag::new("vnd.test.price.v2"));

        let price: PriceV2 = converter.migrate_into(Object::new(PriceV1 { cents: 1999 })).unwrap();
        assert_eq!(
            price,
            PriceV2 {
                amount: "19.99".to_string(),
                currency: "USD".to_string(),
            }
        );
    }

    #[test]
    fn test_converter_passes_through_target_instances() {
        let converter = VersionConverter::new(engine(), VersionTag::new("vnd.test.price.v2"), Options::new());
        let object = Object::new(PriceV2 {
            amount: "1.00".to_string(),
            currency: "EUR".to_string(),
        });
        let before = object.as_ptr();

        assert_eq!(converter.migrate_from(object).unwrap().as_ptr(), before);
    }

    #[test]
    fn test_converter_without_route() {
        let converter = VersionConverter::new(engine(), VersionTag::new("vnd.test.price.v1"), Options::new());
        let error = converter
            .migrate_from(Object::new(PriceV2 {
                amount: "1.00".to_string(),
                currency: "EUR".to_string(),
            }))
            .unwrap_err();
        assert!(error.is_no_route());
    }
}
