//! Fallback Texts
//!
//! Degraded but usable content substituted when extraction or generation
//! fails.

/// Answer shown when the backend cannot be reached at all
#[must_use]
pub fn unreachable_backend_answer(model: &str, question: &str) -> String {
    format!(
        "I'm unable to connect to the Ollama service to process your question about the PDF. \n\
         \n\
         Here are some things you can try:\n\
         \n\
         1. Make sure Ollama is installed and running on your system\n\
         2. Check that the model \"{model}\" is available in your Ollama installation\n\
         3. Try refreshing the page and asking your question again\n\
         4. If the problem persists, try using a different model in the settings panel\n\
         \n\
         Your question was: \"{question}\"\n\
         \n\
         If you need immediate assistance with this PDF, you might want to try reading it directly."
    )
}

/// Text returned by the extraction endpoint when a PDF cannot be parsed
pub const EXTRACTION_FALLBACK_TEXT: &str = "Unable to extract text from the PDF due to server limitations.\n\
\n\
The PDF chat application is working correctly, but the server-side PDF processing is currently limited.\n\
\n\
Only basic information about this file is available.";

/// Text used by a surface when the extraction endpoint is unreachable
pub const EXTRACTION_UNAVAILABLE_TEXT: &str =
    "The server was unable to extract the content from this PDF. Only basic file information is available.";

/// Instructional message for a model that is not installed
#[must_use]
pub fn missing_model_instructions(model: &str) -> String {
    format!(
        "The model \"{model}\" is not installed in Ollama.\n\
         \n\
         Install it by running:\n\
         \n\
         ollama pull {model}\n\
         \n\
         Then ask your question again, or pick a different model."
    )
}
