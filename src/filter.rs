//! Confidential work-order filtering applied to listing responses.

// self
use crate::{
	_prelude::*,
	proxy::{HttpMethod, ResponseData},
};

/// Work-order field that carries the confidential marker.
pub const DEFAULT_MARKER_FIELD: &str = "externtNr";
/// Marker value identifying a confidential work order.
pub const CONFIDENTIAL_SENTINEL: &str = "CONFIDENTIAL";
/// Path fragment identifying the work-order listing.
pub const WORK_ORDER_LISTING_PATH: &str = "/arbetsorder";

/// Drops work orders whose marker field equals the sentinel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfidentialFilter {
	field: String,
	sentinel: String,
}
impl ConfidentialFilter {
	/// Creates a filter matching `field == sentinel`.
	pub fn new(field: impl Into<String>, sentinel: impl Into<String>) -> Self {
		Self { field: field.into(), sentinel: sentinel.into() }
	}

	/// Returns `true` when `item` is an object whose marker field equals the sentinel exactly.
	pub fn is_confidential(&self, item: &Value) -> bool {
		item.get(&self.field).and_then(Value::as_str) == Some(self.sentinel.as_str())
	}

	/// Returns the items that are not confidential, in their original order.
	pub fn filter(&self, items: &[Value]) -> Vec<Value> {
		items.iter().filter(|item| !self.is_confidential(item)).cloned().collect()
	}

	/// Filters `data` in place when it is a JSON array; any other shape is left alone.
	pub fn apply(&self, data: &mut Option<ResponseData>) {
		if let Some(ResponseData::Json(Value::Array(items))) = data {
			items.retain(|item| !self.is_confidential(item));
		}
	}
}
impl Default for ConfidentialFilter {
	fn default() -> Self {
		Self::new(DEFAULT_MARKER_FIELD, CONFIDENTIAL_SENTINEL)
	}
}

/// Filters `items` with the default marker field and sentinel.
///
/// The default field is the work-order API's `externtNr`; items marked through any other field
/// (for example `confidentialMarker`) need [`ConfidentialFilter::new`] instead.
pub fn filter_confidential(items: &[Value]) -> Vec<Value> {
	ConfidentialFilter::default().filter(items)
}

/// Returns `true` for calls whose response is a work-order listing.
pub fn is_work_order_listing(method: HttpMethod, path: &str) -> bool {
	method == HttpMethod::Get && path.contains(WORK_ORDER_LISTING_PATH)
}
