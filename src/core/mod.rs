pub mod binder;
pub mod identity;
pub mod lookup;
pub mod schema;
pub mod workflow;

pub use binder::{form_layout, BoundField, DropdownOption, FieldBinding, InputKind};
pub use identity::IdentityResolver;
pub use lookup::{fetch_lookup_table, load_lookup, LookupState, LookupTable};
pub use schema::{Condition, Rule, Schema, ValidationError, ValidationErrors, Validator};
pub use workflow::{FormController, FormPhase, FormSettings, SubmitOutcome};
