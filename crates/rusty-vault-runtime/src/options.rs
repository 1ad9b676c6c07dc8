use crate::naming::{FIELD_SIGIL, PLURAL_SUFFIX};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeOptions {
    pub claimed_attribute: String,
    pub slot_attribute: String,
    pub completion_event: String,
    pub field_sigil: String,
    pub plural_suffix: String,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            claimed_attribute: "data-claimed".to_owned(),
            slot_attribute: "data-content".to_owned(),
            completion_event: "animationend".to_owned(),
            field_sigil: FIELD_SIGIL.to_owned(),
            plural_suffix: PLURAL_SUFFIX.to_owned(),
        }
    }
}
