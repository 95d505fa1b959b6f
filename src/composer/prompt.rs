use crate::models::UpdateCategory;

/// Instruction sent to the generation backend for one update.
pub fn family_update_prompt(resident_name: &str, category: UpdateCategory, staff_notes: &str) -> String {
    format!(
        "You are an AI assistant for an elderly care home.\n\
         Write a warm, short, and reassuring WhatsApp message to the family of resident \"{resident_name}\".\n\
         \n\
         Context:\n\
         - Activity Category: {category}\n\
         - Staff Notes: \"{staff_notes}\"\n\
         \n\
         Guidelines:\n\
         - Keep it under 50 words.\n\
         - Be professional yet empathetic and cheerful.\n\
         - Do not mention medical specifics unless clearly stated in notes.\n\
         - Format it for WhatsApp (can use single emojis).\n\
         - Start directly with the message.\n"
    )
}

/// Deterministic message used whenever generation is unavailable.
pub fn fallback_message(resident_name: &str, category: UpdateCategory, staff_notes: &str) -> String {
    format!("Update for {resident_name}: {category}. {staff_notes}")
}
