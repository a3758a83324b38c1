//! Fuel-grade template matching (spec.md §4.5): a dispenser's declared
//! grades select which canonical fill-order to drive the form with.

use automation_protocol::dispenser::canonicalize_grades;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormTemplate {
	RegularPlusPremium,
	RegularPlusPremiumDiesel,
	EthanolFreeVariants,
	ThreeGradeEthanolDiesel,
	Custom,
}

impl FormTemplate {
	/// Matches a dispenser's `fuel_grades` against the known template
	/// signatures, falling back to `Custom` (spec.md §4.5: "chosen by
	/// matching the dispenser's declared grades against template
	/// signatures").
	pub fn match_grades(grades: &[String]) -> Self {
		let has = |name: &str| grades.iter().any(|g| g.eq_ignore_ascii_case(name));
		let ethanol_free_count = grades.iter().filter(|g| g.to_lowercase().contains("ethanol-free")).count();

		if ethanol_free_count >= 2 {
			Self::EthanolFreeVariants
		} else if ethanol_free_count == 1 && has("Diesel") {
			Self::ThreeGradeEthanolDiesel
		} else if has("Regular") && has("Plus") && has("Premium") && has("Diesel") {
			Self::RegularPlusPremiumDiesel
		} else if has("Regular") && has("Plus") && has("Premium") {
			Self::RegularPlusPremium
		} else {
			Self::Custom
		}
	}

	/// The order fields are filled in (spec.md §4.5 step 3: "in the
	/// template's canonical order"). `Custom` has no fixed signature, so it
	/// falls back to the global canonical grade ordering applied to
	/// whatever the dispenser actually declared.
	pub fn fill_order(&self, declared_grades: &[String]) -> Vec<String> {
		match self {
			Self::RegularPlusPremium => vec!["Regular".into(), "Plus".into(), "Premium".into()],
			Self::RegularPlusPremiumDiesel => {
				vec!["Regular".into(), "Plus".into(), "Premium".into(), "Diesel".into()]
			}
			Self::EthanolFreeVariants => declared_grades
				.iter()
				.filter(|g| g.to_lowercase().contains("ethanol-free"))
				.cloned()
				.collect(),
			Self::ThreeGradeEthanolDiesel => {
				let mut order: Vec<String> =
					declared_grades.iter().filter(|g| *g != "Diesel").cloned().collect();
				order.push("Diesel".into());
				canonicalize_grades(order)
			}
			Self::Custom => canonicalize_grades(declared_grades.to_vec()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn matches_regular_plus_premium() {
		let grades = vec!["Regular".to_string(), "Plus".to_string(), "Premium".to_string()];
		assert_eq!(FormTemplate::match_grades(&grades), FormTemplate::RegularPlusPremium);
	}

	#[test]
	fn matches_ethanol_free_variants_with_two_or_more() {
		let grades = vec!["Ethanol-Free Regular".to_string(), "Ethanol-Free Plus".to_string()];
		assert_eq!(FormTemplate::match_grades(&grades), FormTemplate::EthanolFreeVariants);
	}

	#[test]
	fn unrecognized_combination_falls_back_to_custom() {
		let grades = vec!["Mystery Blend".to_string()];
		assert_eq!(FormTemplate::match_grades(&grades), FormTemplate::Custom);
	}
}
