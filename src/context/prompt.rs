/// Lays out the persona, retrieved context and question as a single prompt.
pub fn build_prompt(system_prompt: &str, context_text: &str, query: &str) -> String {
    format!(
        "INSTRUCTIONS: {system_prompt}\n\n\
         CONTEXT INFORMATION (Use this to answer):\n{context_text}\n\n\
         USER QUESTION:\n{query}\n\n\
         ANSWER:\n"
    )
}
