//! Product-code models shipped with the CLI, plus the serde codecs that turn
//! `{version, data}` documents into objects and back.

use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_yaml::Value;
use thiserror::Error;

use crate::{
    class::{ClassId, Object},
    metadata::{StaticMetadata, Versioned},
    migration::MigrationDeclaration,
    options::Options,
    version_tag::VersionTag,
};

/// Generic shop code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeV1 {
    pub code: Option<String>,
}

impl Versioned for CodeV1 {
    const VERSION: &'static str = "vnd.evispa.code.v1";
}

/// Product code with optional EAN and UPC barcodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductCodeV1 {
    pub code: Option<String>,
    pub ean: Option<String>,
    pub upc: Option<String>,
}

impl Versioned for ProductCodeV1 {
    const VERSION: &'static str = "vnd.evispa.product.code.v1";

    fn migrations() -> Vec<MigrationDeclaration> {
        vec![
            MigrationDeclaration::from::<CodeV1, ProductCodeV1, _>("fromCodeV1", |other, options| {
                Ok(ProductCodeV1 {
                    code: other.code.as_deref().map(|code| normalize_code(code, options)),
                    ..Default::default()
                })
            }),
            MigrationDeclaration::to::<ProductCodeV1, CodeV1, _>("toCodeV1", |this, _| {
                Ok(CodeV1 {
                    code: this.code.clone(),
                })
            }),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarcodeKind {
    Ean,
    Upc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barcode {
    pub kind: BarcodeKind,
    pub value: String,
}

/// Product code keeping every barcode in one list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductCodeV2 {
    pub code: Option<String>,
    pub barcodes: Vec<Barcode>,
}

impl ProductCodeV2 {
    pub fn first_barcode(&self, kind: BarcodeKind) -> Option<&str> {
        self.barcodes
            .iter()
            .find(|barcode| barcode.kind == kind)
            .map(|barcode| barcode.value.as_str())
    }
}

impl Versioned for ProductCodeV2 {
    const VERSION: &'static str = "vnd.evispa.product.code.v2";

    fn migrations() -> Vec<MigrationDeclaration> {
        vec![
            MigrationDeclaration::from::<ProductCodeV1, ProductCodeV2, _>("fromProductCodeV1", |other, options| {
                let barcodes = [(BarcodeKind::Ean, &other.ean), (BarcodeKind::Upc, &other.upc)]
                    .into_iter()
                    .filter_map(|(kind, value)| {
                        value.as_ref().map(|value| Barcode {
                            kind,
                            value: value.clone(),
                        })
                    })
                    .collect();

                Ok(ProductCodeV2 {
                    code: other.code.as_deref().map(|code| normalize_code(code, options)),
                    barcodes,
                })
            }),
            MigrationDeclaration::to::<ProductCodeV2, ProductCodeV1, _>("toProductCodeV1", |this, _| {
                Ok(ProductCodeV1 {
                    code: this.code.clone(),
                    ean: this.first_barcode(BarcodeKind::Ean).map(str::to_string),
                    upc: this.first_barcode(BarcodeKind::Upc).map(str::to_string),
                })
            }),
        ]
    }
}

/// `uppercase_codes` folds codes to upper case on the way in.
fn normalize_code(code: &str, options: &Options) -> String {
    if options.flag("uppercase_codes") {
        code.to_uppercase()
    } else {
        code.to_string()
    }
}

/// A serialized object tagged with its version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub version: VersionTag,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Version {0} is not part of the catalog")]
    UnknownVersion(VersionTag),

    #[error("Class \"{0}\" has no codec in the catalog")]
    UnknownClass(ClassId),

    #[error("Failed to decode {version}: {source}")]
    Decode {
        version: VersionTag,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to encode {version}: {source}")]
    Encode {
        version: VersionTag,
        #[source]
        source: serde_yaml::Error,
    },
}

struct Codec {
    class: ClassId,
    register: fn(StaticMetadata) -> StaticMetadata,
    decode: fn(Value) -> Result<Object, serde_yaml::Error>,
    encode: fn(&Object) -> Option<Result<Value, serde_yaml::Error>>,
}

/// Versioned models known to the CLI together with their codecs.
pub struct Catalog {
    codecs: IndexMap<VersionTag, Codec>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            codecs: IndexMap::new(),
        }
    }

    /// The product-code models.
    pub fn product_codes() -> Self {
        Self::new()
            .with::<CodeV1>()
            .with::<ProductCodeV1>()
            .with::<ProductCodeV2>()
    }

    pub fn with<T>(mut self) -> Self
    where
        T: Versioned + Serialize + DeserializeOwned,
    {
        self.codecs.insert(
            VersionTag::new(T::VERSION),
            Codec {
                class: ClassId::of::<T>(),
                register: StaticMetadata::register::<T>,
                decode: |value| serde_yaml::from_value::<T>(value).map(Object::new),
                encode: |object| object.downcast_ref::<T>().map(serde_yaml::to_value),
            },
        );
        self
    }

    /// Metadata table for every model in the catalog.
    pub fn metadata(&self) -> StaticMetadata {
        self.codecs
            .values()
            .fold(StaticMetadata::new(), |metadata, codec| (codec.register)(metadata))
    }

    pub fn versions(&self) -> impl Iterator<Item = &VersionTag> {
        self.codecs.keys()
    }

    pub fn class_of(&self, version: &VersionTag) -> Option<ClassId> {
        self.codecs.get(version).map(|codec| codec.class)
    }

    pub fn decode(&self, document: Document) -> Result<Object, CatalogError> {
        let codec = self
            .codecs
            .get(&document.version)
            .ok_or_else(|| CatalogError::UnknownVersion(document.version.clone()))?;

        (codec.decode)(document.data).map_err(|source| CatalogError::Decode {
            version: document.version,
            source,
        })
    }

    pub fn encode(&self, object: &Object) -> Result<Document, CatalogError> {
        let (version, codec) = self
            .codecs
            .iter()
            .find(|(_, codec)| codec.class == object.class())
            .ok_or(CatalogError::UnknownClass(object.class()))?;

        let data = (codec.encode)(object)
            .ok_or(CatalogError::UnknownClass(object.class()))?
            .map_err(|source| CatalogError::Encode {
                version: version.clone(),
                source,
            })?;

        Ok(Document {
            version: version.clone(),
            data,
        })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::product_codes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{engine::MigrationEngine, registry::MigrationRegistry};
    use std::sync::Arc;

    fn engine(catalog: &Catalog) -> MigrationEngine {
        MigrationEngine::new(Arc::new(MigrationRegistry::new(catalog.metadata())))
    }

    #[test]
    fn test_catalog_metadata_is_valid() {
        let catalog = Catalog::product_codes();
        let registry = MigrationRegistry::new(catalog.metadata());

        let report = registry.validate();
        assert!(report.is_valid, "{:?}", report.errors);
        assert_eq!(report.checked_classes, 3);
    }

    #[test]
    fn test_decode_document() {
        let catalog = Catalog::product_codes();
        let document: Document = serde_yaml::from_str(
            r#"
            version: vnd.evispa.product.code.v1
            data:
              code: abc-1
              ean: "4006381333931"
            "#,
        )
        .unwrap();

        let object = catalog.decode(document).unwrap();
        let code = object.downcast_ref::<ProductCodeV1>().unwrap();
        assert_eq!(code.code.as_deref(), Some("abc-1"));
        assert_eq!(code.ean.as_deref(), Some("4006381333931"));
        assert!(code.upc.is_none());
    }

    #[test]
    fn test_decode_unknown_version() {
        let catalog = Catalog::product_codes();
        let document = Document {
            version: VersionTag::new("vnd.evispa.product.v9"),
            data: Value::Null,
        };
        assert!(matches!(catalog.decode(document), Err(CatalogError::UnknownVersion(_))));
    }

    #[test]
    fn test_code_v1_to_product_code_v2() {
        let catalog = Catalog::product_codes();
        let engine = engine(&catalog);
        let options = Options::new().with("uppercase_codes", true);

        let code = Object::new(CodeV1 {
            code: Some("abc-1".to_string()),
        });
        let result = engine
            .convert_with_report(code, &VersionTag::new(ProductCodeV2::VERSION), &options)
            .unwrap();

        assert_eq!(result.applied_migrations.len(), 2);
        let v2 = result.object.downcast_ref::<ProductCodeV2>().unwrap();
        assert_eq!(v2.code.as_deref(), Some("ABC-1"));
        assert!(v2.barcodes.is_empty());
    }

    #[test]
    fn test_product_code_round_trip() {
        let catalog = Catalog::product_codes();
        let engine = engine(&catalog);
        let original = ProductCodeV1 {
            code: Some("abc-1".to_string()),
            ean: Some("4006381333931".to_string()),
            upc: Some("036000291452".to_string()),
        };

        let v2 = engine
            .convert(
                Object::new(original.clone()),
                &VersionTag::new(ProductCodeV2::VERSION),
                &Options::new(),
            )
            .unwrap();
        assert_eq!(v2.downcast_ref::<ProductCodeV2>().unwrap().barcodes.len(), 2);

        let back: ProductCodeV1 = engine.convert_into(v2, &Options::new()).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_encode_document() {
        let catalog = Catalog::product_codes();
        let object = Object::new(ProductCodeV2 {
            code: Some("abc".to_string()),
            barcodes: vec![Barcode {
                kind: BarcodeKind::Upc,
                value: "036000291452".to_string(),
            }],
        });

        let document = catalog.encode(&object).unwrap();
        assert_eq!(document.version, VersionTag::new(ProductCodeV2::VERSION));
        assert_eq!(document.data["barcodes"][0]["kind"], Value::String("upc".to_string()));

        assert!(matches!(catalog.encode(&Object::new(7_u8)), Err(CatalogError::UnknownClass(_))));
    }
}
