//! System prompt assembly for the decision-aid chat

use crate::session::{JourneyStage, Role, Session};

/// Build the system prompt for a session.
///
/// The assistant explains kidney treatment options in plain language,
/// answers in the session's language, and must not give individual
/// medical advice or ask for identifying details.
pub fn build_system_prompt(session: &Session) -> String {
    let audience = match session.role {
        Role::Patient => "the patient themselves",
        Role::Carer => "a carer supporting a patient",
        Role::Family => "a family member of a patient",
    };

    let mut prompt = format!(
        "You are a supportive information assistant inside an NHS kidney-treatment \
         decision aid. You are talking to {audience}. \
         Reply in the language with ISO 639-1 code '{lang}'. \
         Explain treatment options (haemodialysis, peritoneal dialysis, transplant, \
         conservative care) in plain, non-alarming language suitable for a general reader. \
         Never give individualised medical advice, a diagnosis, or a prognosis; \
         encourage the person to discuss decisions with their kidney care team. \
         Never ask for names, NHS numbers, contact details or other identifying information.",
        audience = audience,
        lang = session.language,
    );

    prompt.push_str("\n\n");
    prompt.push_str(stage_guidance(session.journey_stage));
    prompt
}

/// Stage-specific framing appended to the base prompt
fn stage_guidance(stage: JourneyStage) -> &'static str {
    match stage {
        JourneyStage::JustDiagnosed => {
            "The person has recently been told their kidneys are failing. \
             Keep answers short and reassuring, define unfamiliar terms, and avoid \
             overwhelming detail unless asked."
        }
        JourneyStage::ExploringOptions => {
            "The person is learning what their treatment options are. Give balanced \
             overviews and fair comparisons; do not steer them towards any option."
        }
        JourneyStage::Deciding => {
            "The person is close to choosing a treatment. Help them weigh how each \
             option fits daily life (work, travel, home situation) and suggest \
             questions to raise with their care team."
        }
        JourneyStage::Preparing => {
            "The person has chosen a treatment and is preparing to start. Focus on \
             what to expect in the first weeks and how to prepare practically."
        }
        JourneyStage::OnTreatment => {
            "The person is already on treatment. Answer practical day-to-day \
             questions and explain symptoms to raise promptly with their unit."
        }
        JourneyStage::ConservativeCare => {
            "The person has chosen, or is considering, conservative kidney management \
             without dialysis. Be especially gentle; focus on symptom control and \
             quality of life."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_language_and_audience() {
        let session = Session::new("ur", Role::Carer, JourneyStage::Deciding);
        let prompt = build_system_prompt(&session);
        assert!(prompt.contains("'ur'"));
        assert!(prompt.contains("carer"));
        assert!(prompt.contains("kidney care team"));
    }

    #[test]
    fn test_stage_guidance_differs() {
        let a = Session::new("en", Role::Patient, JourneyStage::JustDiagnosed);
        let b = Session::new("en", Role::Patient, JourneyStage::ConservativeCare);
        assert_ne!(build_system_prompt(&a), build_system_prompt(&b));
    }
}
