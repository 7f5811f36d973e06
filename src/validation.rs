use serde::{Deserialize, Serialize};

use crate::{
    class::ClassId,
    error::{MigrationError, Result},
    migration::{Direction, MethodKind, MigrationDeclaration},
};

/// Checks the shape of one declaration made on `class`.
///
/// Inbound migrations must be factories taking `(source, options)` and
/// producing `class`; outbound ones must be bound to an instance, take
/// `(options)` and produce the neighbour.
pub fn check_declaration(class: ClassId, declaration: &MigrationDeclaration) -> Result<()> {
    let signature = &declaration.signature;
    let invalid = |reason: &str| MigrationError::InvalidSignature {
        class,
        method: signature.name.clone(),
        reason: reason.to_string(),
    };

    if declaration.owner != class {
        return Err(invalid(&format!("is declared on \"{}\"", declaration.owner)));
    }

    match declaration.direction {
        Direction::From => {
            if signature.kind != MethodKind::Factory || signature.parameters != 2 {
                return Err(invalid("should be static and require 2 parameters."));
            }
            if signature.returns != class {
                return Err(invalid(&format!("should return \"{}\"", class)));
            }
        }
        Direction::To => {
            if signature.kind != MethodKind::Instance || signature.parameters != 1 {
                return Err(invalid("should not be static and require 1 parameter."));
            }
            if signature.returns != declaration.neighbor {
                return Err(invalid(&format!("should return \"{}\"", declaration.neighbor)));
            }
        }
    }

    if declaration.neighbor == class {
        return Err(MigrationError::SelfMigration {
            class,
            method: signature.name.clone(),
            direction: declaration.direction,
        });
    }

    Ok(())
}

/// Outcome of validating every class a registry knows about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub checked_classes: usize,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            checked_classes: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// A class whose metadata cannot be served.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub class: String,
    pub error_type: ValidationErrorType,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorType {
    NotVersioned,
    MalformedVersion,
    InvalidSignature,
    SelfMigration,
    DuplicateMigration,
    VersionConflict,
    Other,
}

impl ValidationError {
    pub fn new(class: ClassId, error: &MigrationError) -> Self {
        let error_type = match error {
            MigrationError::NotVersioned(_) => ValidationErrorType::NotVersioned,
            MigrationError::MalformedVersion { .. } => ValidationErrorType::MalformedVersion,
            MigrationError::InvalidSignature { .. } => ValidationErrorType::InvalidSignature,
            MigrationError::SelfMigration { .. } => ValidationErrorType::SelfMigration,
            MigrationError::DuplicateMigration { .. } => ValidationErrorType::DuplicateMigration,
            MigrationError::VersionConflict { .. } => ValidationErrorType::VersionConflict,
            _ => ValidationErrorType::Other,
        };

        Self {
            class: class.name().to_string(),
            error_type,
            message: error.to_string(),
        }
    }
}

/// Non-fatal finding, such as a version nothing can convert to or from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub class: String,
    pub warning_type: ValidationWarningType,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationWarningType {
    IsolatedVersion,
}

impl ValidationWarning {
    pub fn new(class: ClassId, warning_type: ValidationWarningType, message: String) -> Self {
        Self {
            class: class.name().to_string(),
            warning_type,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{class::Object, error::BoxError, migration::MethodSignature, options::Options};
    use std::sync::Arc;

    struct Order;
    struct OrderV2;

    fn raw(direction: Direction, neighbor: ClassId, kind: MethodKind, parameters: usize, returns: ClassId) -> MigrationDeclaration {
        MigrationDeclaration::raw(
            ClassId::of::<Order>(),
            direction,
            neighbor,
            MethodSignature {
                name: "migrate".to_string(),
                kind,
                parameters,
                returns,
            },
            Arc::new(|_: &Object, _: &Options| -> std::result::Result<Object, BoxError> { Err("unused".into()) }),
        )
    }

    #[test]
    fn test_typed_declarations_pass() {
        let from = MigrationDeclaration::from::<OrderV2, Order, _>("fromV2", |_, _| Ok(Order));
        let to = MigrationDeclaration::to::<Order, OrderV2, _>("toV2", |_, _| Ok(OrderV2));

        assert!(check_declaration(ClassId::of::<Order>(), &from).is_ok());
        assert!(check_declaration(ClassId::of::<Order>(), &to).is_ok());
    }

    #[test]
    fn test_outbound_without_options_parameter_is_rejected() {
        let declaration = raw(Direction::To, ClassId::of::<OrderV2>(), MethodKind::Instance, 0, ClassId::of::<OrderV2>());
        let error = check_declaration(ClassId::of::<Order>(), &declaration).unwrap_err();
        assert!(matches!(error, MigrationError::InvalidSignature { .. }));
    }

    #[test]
    fn test_outbound_factory_is_rejected() {
        let declaration = raw(Direction::To, ClassId::of::<OrderV2>(), MethodKind::Factory, 1, ClassId::of::<OrderV2>());
        let error = check_declaration(ClassId::of::<Order>(), &declaration).unwrap_err();
        assert!(matches!(error, MigrationError::InvalidSignature { .. }));
    }

    #[test]
    fn test_inbound_instance_method_is_rejected() {
        let declaration = raw(Direction::From, ClassId::of::<OrderV2>(), MethodKind::Instance, 2, ClassId::of::<Order>());
        let error = check_declaration(ClassId::of::<Order>(), &declaration).unwrap_err();
        assert!(matches!(error, MigrationError::InvalidSignature { .. }));
        assert!(error.to_string().contains("should be static and require 2 parameters."));
    }

    #[test]
    fn test_inbound_returning_other_class_is_rejected() {
        let declaration = raw(Direction::From, ClassId::of::<OrderV2>(), MethodKind::Factory, 2, ClassId::of::<OrderV2>());
        let error = check_declaration(ClassId::of::<Order>(), &declaration).unwrap_err();
        assert!(matches!(error, MigrationError::InvalidSignature { .. }));
    }

    #[test]
    fn test_declaration_on_wrong_owner_is_rejected() {
        let declaration = MigrationDeclaration::to::<Order, OrderV2, _>("toV2", |_, _| Ok(OrderV2));
        let error = check_declaration(ClassId::of::<OrderV2>(), &declaration).unwrap_err();
        assert!(matches!(error, MigrationError::InvalidSignature { .. }));
    }

    #[test]
    fn test_self_migration_is_rejected() {
        let declaration = MigrationDeclaration::to::<Order, Order, _>("toSelf", |_, _| Ok(Order));
        let error = check_declaration(ClassId::of::<Order>(), &declaration).unwrap_err();
        assert!(matches!(
            error,
            MigrationError::SelfMigration { direction: Direction::To, .. }
        ));
    }

    #[test]
    fn test_validation_report_tracks_validity() {
        let mut report = ValidationReport::new();
        assert!(report.is_valid);
        assert!(!report.has_errors());

        report.add_warning(ValidationWarning::new(
            ClassId::of::<Order>(),
            ValidationWarningType::IsolatedVersion,
            "no migrations".to_string(),
        ));
        assert!(report.is_valid);
        assert!(report.has_warnings());

        let error = MigrationError::NotVersioned(ClassId::of::<Order>());
        report.add_error(ValidationError::new(ClassId::of::<Order>(), &error));
        assert!(!report.is_valid);
        assert_eq!(report.errors[0].error_type, ValidationErrorType::NotVersioned);
    }
}
