//! The default diagnostic prompt. The user can edit it freely in the form;
//! whatever text is submitted goes to the model verbatim.

use crate::session::LeafContext;

/// Build the four-step diagnostic prompt, embedding the context fields
/// verbatim. The embedding happens here and only here; editing the
/// context afterwards does not rewrite an already-generated prompt.
pub fn default_prompt(context: &LeafContext) -> String {
    let species = fallback(&context.species, "unknown plant");
    let region = fallback(&context.region, "any region");
    let season = fallback(&context.season, "any season");

    format!(
        "Act as a plant pathology expert.\n\
         Step 1: Observe any visual symptoms such as color change, fungal growth, holes, or spots on the leaves.\n\
         Step 2: Compare symptoms with known plant diseases for {species} in {region} during {season}.\n\
         Step 3: Suggest 3 most probable diseases with confidence percentages.\n\
         Step 4: Mention if diagnosis is uncertain and recommend next steps (e.g., lab testing or fungicide use).\n"
    )
}

fn fallback<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}
