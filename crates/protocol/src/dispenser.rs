//! Dispenser domain type and the canonical fuel-grade ordering (spec.md §3, §4.4.2).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Canonical fuel-grade ordering used to normalize `grades_list` (spec.md §4.4.2)
/// and to match dispensers against form templates (spec.md §4.5).
pub const CANONICAL_GRADE_ORDER: &[&str] = &[
	"Regular",
	"Midgrade",
	"Plus",
	"Premium",
	"Diesel",
	"Ethanol-Free Regular",
	"Ethanol-Free Plus",
	"Ethanol-Free Premium",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelGrade(pub String);

impl FuelGrade {
	pub fn new(name: impl Into<String>) -> Self {
		Self(name.into())
	}

	/// Position in [`CANONICAL_GRADE_ORDER`], or `usize::MAX` for an
	/// unrecognized grade (sorted last, stably, rather than erroring).
	pub fn canonical_rank(&self) -> usize {
		CANONICAL_GRADE_ORDER
			.iter()
			.position(|g| g.eq_ignore_ascii_case(self.0.trim()))
			.unwrap_or(usize::MAX)
	}
}

/// Sorts a list of scraped grade names into canonical order (stable so
/// unrecognized grades keep their relative scrape order, trailing).
pub fn canonicalize_grades(mut grades: Vec<String>) -> Vec<String> {
	grades.sort_by_key(|g| FuelGrade::new(g.clone()).canonical_rank());
	grades
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispenser {
	pub id: Uuid,
	pub work_order_id: Uuid,
	/// Display number, e.g. `"1/2"` for a dual-sided dispenser.
	pub number: String,
	/// Individual side numbers parsed out of `number`, e.g. `["1", "2"]`.
	pub numbers: Vec<String>,
	pub title: Option<String>,
	pub make: Option<String>,
	pub model: Option<String>,
	pub serial_number: Option<String>,
	pub nozzles: Option<u32>,
	pub meter_type: Option<String>,
	pub stand_alone_code: Option<String>,
	/// Canonically-ordered fuel grades (spec.md §4.4.2).
	pub fuel_grades: Vec<String>,
	pub custom_fields: HashMap<String, String>,
}

/// Manufacturers recognized when `Make`/`Model` labels are absent
/// (spec.md §4.4.2 step 5).
pub const KNOWN_MANUFACTURERS: &[&str] =
	&["Gilbarco", "Wayne", "Dresser", "Tokheim", "Bennett"];

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn grades_sort_into_canonical_order() {
		let grades = vec!["Diesel".to_string(), "Regular".to_string(), "Plus".to_string()];
		assert_eq!(canonicalize_grades(grades), vec!["Regular", "Plus", "Diesel"]);
	}

	#[test]
	fn unrecognized_grade_sorts_last() {
		let grades = vec!["Mystery Blend".to_string(), "Regular".to_string()];
		assert_eq!(canonicalize_grades(grades), vec!["Regular", "Mystery Blend"]);
	}
}
