// ============================================================
// Application / Use Cases
// ============================================================
// Each use case wires the library layers together for one
// command and returns a plain report. Printing stays in the
// CLI layer; no model or image code lives here.

// Dataset summary: sizes, vocabularies, class weights
pub mod inspect_use_case;

// One batch through the multitask model
pub mod check_use_case;
