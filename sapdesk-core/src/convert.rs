//! Artifact conversions
//!
//! A classified requirement turns into exactly one delivery artifact: a
//! configuration item for a Fit, a WRICEF item for a Gap or Partial Fit.
//! WRICEF and config items in turn turn their unit-test narrative into a
//! formal test case.
//!
//! The server is the authority on both conversions. The client mirrors the
//! requirement precondition so it never sends a request the server would
//! refuse, and only touches local state once the server has confirmed.

use log::{info, warn};

use crate::api::{ApiClient, ConversionReceipt, TestReceipt};
use crate::error::ConsoleError;
use crate::models::{
    Classification, ConfigItem, ConversionStatus, ConversionType, Entity, Requirement, SourceType,
    WricefItem,
};

pub const CONVERSION_FAILED: &str = "Conversion failed";
pub const CONVERTED: &str = "Converted successfully";

/// Artifact a classification converts into
pub fn conversion_target(classification: Classification) -> ConversionType {
    match classification {
        Classification::Fit => ConversionType::Config,
        Classification::PartialFit | Classification::Gap => ConversionType::Wricef,
    }
}

/// Why a requirement cannot be converted, or `None` if it can
pub fn conversion_block(requirement: &Requirement) -> Option<String> {
    if requirement.is_converted() {
        let target = requirement
            .conversion
            .conversion_type
            .map(|t| format!(" to {}", t))
            .unwrap_or_default();
        return Some(format!("already converted{}", target));
    }
    if requirement.fields.classification.is_none() {
        return Some("requirement has no Fit/Gap classification".to_string());
    }
    None
}

/// True iff the requirement is classified and not yet converted
pub fn can_convert(requirement: &Requirement) -> bool {
    conversion_block(requirement).is_none()
}

/// Marks a requirement converted according to a confirmed server receipt
pub fn apply_receipt(requirement: &mut Requirement, receipt: &ConversionReceipt) {
    requirement.conversion.conversion_status = Some(ConversionStatus::Converted);
    requirement.conversion.conversion_type = Some(receipt.conversion_type);
    requirement.conversion.conversion_id = Some(receipt.created_item_id.clone());
}

/// Converts a requirement and patches it in place on success
///
/// The record is left untouched when the precondition fails or the server
/// refuses, so there is never a half-converted local copy.
pub fn convert_requirement(
    client: &ApiClient,
    requirement: &mut Requirement,
) -> Result<ConversionReceipt, ConsoleError> {
    if let Some(reason) = conversion_block(requirement) {
        return Err(ConsoleError::NotConvertible { reason });
    }

    match client.convert_requirement(&requirement.id) {
        Ok(receipt) => {
            apply_receipt(requirement, &receipt);
            info!(
                "Requirement {} converted to {} {}",
                requirement.id, receipt.conversion_type, receipt.created_item_id
            );
            Ok(receipt)
        }
        Err(e) => {
            warn!("Conversion of requirement {} failed: {}", requirement.id, e);
            Err(e.into())
        }
    }
}

/// Describes a confirmed conversion for the editor
pub fn receipt_message(receipt: &ConversionReceipt) -> String {
    format!(
        "Converted to {} (item {})",
        receipt.conversion_type, receipt.created_item_id
    )
}

/// A delivery artifact whose unit-test narrative can become a test case
pub trait TestSource: Entity {
    const SOURCE: SourceType;

    fn unit_test_steps(&self) -> Option<&str>;

    fn has_unit_test(&self) -> bool {
        self.unit_test_steps()
            .map(|steps| !steps.trim().is_empty())
            .unwrap_or(false)
    }
}

impl TestSource for WricefItem {
    const SOURCE: SourceType = SourceType::Wricef;

    fn unit_test_steps(&self) -> Option<&str> {
        self.fields.unit_test_steps.as_deref()
    }
}

impl TestSource for ConfigItem {
    const SOURCE: SourceType = SourceType::Config;

    fn unit_test_steps(&self) -> Option<&str> {
        self.fields.unit_test_steps.as_deref()
    }
}

/// Creates a unit test case from an item's unit-test steps
///
/// Nothing is written back into the source item.
pub fn convert_to_test<T: TestSource>(
    client: &ApiClient,
    item: &T,
) -> Result<TestReceipt, ConsoleError> {
    if !item.has_unit_test() {
        return Err(ConsoleError::MissingUnitTest);
    }
    let receipt = client.convert_to_test(T::COLLECTION, item.id())?;
    info!(
        "{} {} converted to test {}",
        T::LABEL,
        item.id(),
        receipt
            .test_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "?".to_string())
    );
    Ok(receipt)
}
