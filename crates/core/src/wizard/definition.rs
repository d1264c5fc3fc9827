//! Step configuration and step resolution.

use std::collections::HashSet;

use crate::error::CoreError;
use crate::forms::FormKind;

// ---------------------------------------------------------------------------
// Step configuration
// ---------------------------------------------------------------------------

/// One concrete form a branched step can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchVariant {
    /// Value of the selector field that picks this variant.
    pub value: &'static str,
    pub form: FormKind,
    pub template: &'static str,
}

/// The form a step shows: fixed, or chosen by a value captured earlier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepForm {
    Single {
        form: FormKind,
        template: &'static str,
    },
    Branched {
        /// Field, owned by an earlier step, whose value selects the variant.
        selector: &'static str,
        /// Variant used when no valid selector value is available.
        fallback: &'static str,
        variants: Vec<BranchVariant>,
    },
}

/// A single page of the wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSpec {
    /// Identifier used in the `current_step` query parameter.
    pub id: &'static str,
    pub header: &'static str,
    pub form: StepForm,
    /// When set, a POST lacking this field is treated as an empty submission.
    pub submit_marker: Option<&'static str>,
}

impl StepSpec {
    pub fn single(
        id: &'static str,
        header: &'static str,
        form: FormKind,
        template: &'static str,
    ) -> Self {
        Self {
            id,
            header,
            form: StepForm::Single { form, template },
            submit_marker: None,
        }
    }

    pub fn branched(
        id: &'static str,
        header: &'static str,
        selector: &'static str,
        fallback: &'static str,
        variants: Vec<BranchVariant>,
    ) -> Self {
        Self {
            id,
            header,
            form: StepForm::Branched {
                selector,
                fallback,
                variants,
            },
            submit_marker: None,
        }
    }

    pub fn with_submit_marker(mut self, field: &'static str) -> Self {
        self.submit_marker = Some(field);
        self
    }

    /// Form and template for this step under the given branch value.
    ///
    /// Unknown or missing branch values fall back to the configured variant.
    pub fn form_for(&self, branch: Option<&str>) -> (FormKind, &'static str) {
        match &self.form {
            StepForm::Single { form, template } => (*form, *template),
            StepForm::Branched {
                fallback, variants, ..
            } => {
                let chosen = branch
                    .and_then(|b| variants.iter().find(|v| v.value == b))
                    .or_else(|| variants.iter().find(|v| v.value == *fallback))
                    .unwrap_or_else(|| &variants[0]);
                (chosen.form, chosen.template)
            }
        }
    }

    /// Every field any variant of this step can own.
    fn all_fields(&self) -> Vec<&'static str> {
        match &self.form {
            StepForm::Single { form, .. } => form.fields().to_vec(),
            StepForm::Branched { variants, .. } => variants
                .iter()
                .flat_map(|v| v.form.fields().iter().copied())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Definition
// ---------------------------------------------------------------------------

/// The result of mapping a requested step onto the definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedStep {
    /// Index into [`WizardDefinition::steps`].
    pub index: usize,
    /// `true` when the request named a step that does not exist. Such a
    /// request is always rendered fresh, even if it carried POST data.
    pub corrected: bool,
    /// The requested branch value, if it names a known variant.
    pub branch: Option<&'static str>,
}

/// Fixed, ordered sequence of wizard steps.
#[derive(Debug, Clone)]
pub struct WizardDefinition {
    steps: Vec<StepSpec>,
}

impl WizardDefinition {
    /// Build a definition, checking its structural invariants.
    ///
    /// - at least one step;
    /// - unique step ids;
    /// - every branched step has variants, a fallback among them, and a
    ///   selector field owned by an earlier step.
    pub fn new(steps: Vec<StepSpec>) -> Result<Self, CoreError> {
        if steps.is_empty() {
            return Err(CoreError::Validation(
                "A wizard needs at least one step".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (index, step) in steps.iter().enumerate() {
            if !seen.insert(step.id) {
                return Err(CoreError::Validation(format!(
                    "Duplicate wizard step id '{}'",
                    step.id
                )));
            }

            if let StepForm::Branched {
                selector,
                fallback,
                variants,
            } = &step.form
            {
                if !variants.iter().any(|v| v.value == *fallback) {
                    return Err(CoreError::Validation(format!(
                        "Step '{}' falls back to unknown branch '{fallback}'",
                        step.id
                    )));
                }
                let owned_earlier = steps[..index]
                    .iter()
                    .any(|earlier| earlier.all_fields().contains(selector));
                if !owned_earlier {
                    return Err(CoreError::Validation(format!(
                        "Step '{}' branches on '{selector}', which no earlier step collects",
                        step.id
                    )));
                }
            }
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Never true for a definition built through [`WizardDefinition::new`].
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> &StepSpec {
        &self.steps[index]
    }

    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    /// Name of the field (and query parameter) that selects branches.
    pub fn branch_param(&self) -> Option<&'static str> {
        self.steps.iter().find_map(|s| match &s.form {
            StepForm::Branched { selector, .. } => Some(*selector),
            StepForm::Single { .. } => None,
        })
    }

    /// Canonical spelling of a branch value, if any branched step knows it.
    pub fn known_branch(&self, value: &str) -> Option<&'static str> {
        self.steps.iter().find_map(|s| match &s.form {
            StepForm::Branched { variants, .. } => {
                variants.iter().find(|v| v.value == value).map(|v| v.value)
            }
            StepForm::Single { .. } => None,
        })
    }

    /// Whether the step at `index` collects the branch selector field.
    pub fn selects_branch(&self, index: usize) -> bool {
        match self.branch_param() {
            Some(param) => self.steps[index].all_fields().contains(&param),
            None => false,
        }
    }

    /// Map a requested step id and branch value onto the definition.
    ///
    /// Absent or empty ids resolve to the first step. Unknown ids also
    /// resolve to the first step but are flagged as corrected.
    pub fn resolve(&self, requested: Option<&str>, branch: Option<&str>) -> ResolvedStep {
        let branch = branch.and_then(|b| self.known_branch(b));

        match requested.filter(|id| !id.is_empty()) {
            None => ResolvedStep {
                index: 0,
                corrected: false,
                branch,
            },
            Some(id) => match self.position(id) {
                Some(index) => ResolvedStep {
                    index,
                    corrected: false,
                    branch,
                },
                None => ResolvedStep {
                    index: 0,
                    corrected: true,
                    branch,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{FIELD_GOVERNMENT_TYPE, GOVERNMENT_TYPE_FEDERAL, GOVERNMENT_TYPE_PT};

    fn org_variants() -> Vec<BranchVariant> {
        vec![
            BranchVariant {
                value: GOVERNMENT_TYPE_FEDERAL,
                form: FormKind::FederalOrganisation,
                template: "federal.html",
            },
            BranchVariant {
                value: GOVERNMENT_TYPE_PT,
                form: FormKind::PtOrganisation,
                template: "pt.html",
            },
        ]
    }

    fn sample() -> WizardDefinition {
        WizardDefinition::new(vec![
            StepSpec::single("logo", "Logo", FormKind::ServiceLogo, "logo.html"),
            StepSpec::single("type", "Type", FormKind::OrganisationType, "type.html"),
            StepSpec::branched(
                "org",
                "Org",
                FIELD_GOVERNMENT_TYPE,
                GOVERNMENT_TYPE_FEDERAL,
                org_variants(),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_empty_definition() {
        assert!(WizardDefinition::new(vec![]).is_err());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = WizardDefinition::new(vec![
            StepSpec::single("a", "A", FormKind::ServiceLogo, "a.html"),
            StepSpec::single("a", "A", FormKind::ServiceName, "a.html"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_branch_without_earlier_selector() {
        let result = WizardDefinition::new(vec![StepSpec::branched(
            "org",
            "Org",
            FIELD_GOVERNMENT_TYPE,
            GOVERNMENT_TYPE_FEDERAL,
            org_variants(),
        )]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_fallback() {
        let result = WizardDefinition::new(vec![
            StepSpec::single("type", "Type", FormKind::OrganisationType, "type.html"),
            StepSpec::branched("org", "Org", FIELD_GOVERNMENT_TYPE, "other", org_variants()),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_or_empty_step_resolves_to_first_uncorrected() {
        let def = sample();
        for requested in [None, Some("")] {
            let resolved = def.resolve(requested, None);
            assert_eq!(resolved.index, 0);
            assert!(!resolved.corrected);
        }
    }

    #[test]
    fn unknown_step_resolves_to_first_and_is_corrected() {
        let def = sample();
        let once = def.resolve(Some("bogus"), None);
        assert_eq!(once.index, 0);
        assert!(once.corrected);
        // Resolving the canonical id again is stable.
        let again = def.resolve(Some(def.step(once.index).id), None);
        assert_eq!(again.index, 0);
    }

    #[test]
    fn known_step_resolves_to_its_index() {
        let def = sample();
        let resolved = def.resolve(Some("org"), Some("pt"));
        assert_eq!(resolved.index, 2);
        assert_eq!(resolved.branch, Some(GOVERNMENT_TYPE_PT));
    }

    #[test]
    fn unknown_branch_is_dropped() {
        let def = sample();
        assert_eq!(def.resolve(Some("org"), Some("martian")).branch, None);
    }

    #[test]
    fn branched_step_falls_back_when_branch_missing() {
        let def = sample();
        let (form, template) = def.step(2).form_for(None);
        assert_eq!(form, FormKind::FederalOrganisation);
        assert_eq!(template, "federal.html");

        let (form, _) = def.step(2).form_for(Some(GOVERNMENT_TYPE_PT));
        assert_eq!(form, FormKind::PtOrganisation);
    }

    #[test]
    fn selector_step_is_detected() {
        let def = sample();
        assert_eq!(def.branch_param(), Some(FIELD_GOVERNMENT_TYPE));
        assert!(!def.selects_branch(0));
        assert!(def.selects_branch(1));
        assert!(!def.selects_branch(2));
    }
}
