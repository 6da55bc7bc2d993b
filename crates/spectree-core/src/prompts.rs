//! Prompt rendering
//!
//! Plain functions; the wording is not load-bearing but the JSON shapes
//! requested here are the ones the gateway and resolver parse.

const DOCSTRING_INSTRUCTIONS: &str = "\
When you write a docstring it is to be in the numpydoc format.

When writing a docstring do not include examples or notes.
Keep the function referred to by the docstring as simple as
possible, but no simpler.";

const ROOT_EXAMPLE: &str = "\
Calls a large language model (LLM) with the given prompt and
returns the generated response.

Parameters
----------
prompt : str
    The input prompt to be used when calling the LLM.

Returns
-------
str
    The generated response from the LLM";

/// First line of the root prompt
pub const ROOT_HEADING: &str = "# Writing a docstring for a function to fulfil a task";
/// First line of the children prompt
pub const CHILDREN_HEADING: &str = "# Writing a list of child docstrings for a parent docstring";
/// First line of the comparison prompt
pub const COMPARISON_HEADING: &str = "# Docstring comparison";
/// First line of the repair preamble
pub const REPAIR_HEADING: &str = "# Error Message";

/// Separator between indexed entries of the comparison prompt
pub const COMPARISON_SEPARATOR: &str = "\n\n---\n\n";

/// Prompt asking for the single docstring that fulfils `task`
#[must_use]
pub fn root(task: &str) -> String {
    format!(
        "{ROOT_HEADING}\n\n\
         ## Instructions\n\n{DOCSTRING_INSTRUCTIONS}\n\n\
         ## Your task\n\n{task}\n\n\
         ## Example response\n\n{ROOT_EXAMPLE}\n\n\
         ## Your response"
    )
}

/// Prompt asking for a JSON array of child docstrings of `docstring`
#[must_use]
pub fn children(task: &str, docstring: &str) -> String {
    format!(
        "{CHILDREN_HEADING}\n\n\
         ## Instructions\n\n\
         You are a single component of an AI cluster.\n\n\
         You are aiming to create a list of child docstrings in order to\n\
         help the cluster of AI agents write a library of functions that\n\
         achieves the original task.\n\n\
         DO NOT create docstrings for the original task itself, other\n\
         AI agents will be doing that. Instead, only create docstrings\n\
         for functions that will be explicitly helpful in the creation\n\
         of your given parent docstring.\n\n\
         {DOCSTRING_INSTRUCTIONS}\n\n\
         ## Your parent docstring\n\n{docstring}\n\n\
         ## The original task\n\n{task}\n\n\
         ## Required JSON format\n\n\
         [\n    \"<1st docstring>\",\n    \"<2nd docstring>\",\n    ...\n    \"<nth docstring>\"\n]\n\n\
         ## Example response\n\n\
         [\n    \"Returns the current date and time in ISO format.\\n\\nReturns\\n-------\\nstr\\n    The current date and time in ISO 8601 format.\"\n]\n\n\
         ## Second example response\n\n[]\n\n\
         ## Your JSON response (ONLY respond with JSON, nothing else)"
    )
}

/// Render similar docstrings as `[i]` blocks joined by `---`
#[must_use]
pub fn indexed_list(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("[{i}]\n{item}"))
        .collect::<Vec<_>>()
        .join(COMPARISON_SEPARATOR)
}

/// Prompt asking which of `similar` matches `base`, if any
#[must_use]
pub fn comparison(base: &str, similar: &[String]) -> String {
    let similar = indexed_list(similar);
    format!(
        "{COMPARISON_HEADING}\n\n\
         ## Instructions\n\n\
         You are comparing a base docstring to a series of similar\n\
         docstrings. It is your goal to determine which of the docstrings\n\
         is most similar to the base docstring.\n\n\
         You are then to determine if the function produced by the most\n\
         similar docstring is the same as the function produced by the\n\
         base docstring.\n\n\
         ## Base docstring\n\n{base}\n\n\
         ## Similar docstrings\n\n{similar}\n\n\
         ## Required JSON format\n\n\
         {{\n    \"think step by step\": \"<step by step reasoning>\",\n    \
         \"most similar\": <index of most similar docstring>,\n    \
         \"same function\": <true or false>,\n    \
         \"explanation\": \"<explanation>\"\n}}\n\n\
         ## Your JSON response (ONLY respond with JSON, nothing else)"
    )
}

/// Block prepended to the original prompt after an unparseable response
#[must_use]
pub fn repair_preamble(error: &str, response: &str) -> String {
    format!(
        "{REPAIR_HEADING}\n\n\
         You previously attempted the prompt below, however, when\n\
         attempting to parse your previous response as JSON the\n\
         following error was raised:\n\n{error}\n\n\
         The response you previously provided was:\n\n{response}\n\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_embeds_task() {
        let prompt = root("reverse a string");
        assert!(prompt.contains("## Your task\n\nreverse a string\n"));
        assert!(prompt.ends_with("## Your response"));
    }

    #[test]
    fn children_embeds_parent_and_task() {
        let prompt = children("summarize a page", "Fetches a URL.");
        assert!(prompt.contains("## Your parent docstring\n\nFetches a URL.\n"));
        assert!(prompt.contains("## The original task\n\nsummarize a page\n"));
        assert!(prompt.contains("ONLY respond with JSON"));
    }

    #[test]
    fn comparison_indexes_entries() {
        let prompt = comparison("base", &["first".to_string(), "second".to_string()]);
        assert!(prompt.contains("[0]\nfirst\n\n---\n\n[1]\nsecond"));
        assert!(prompt.contains("\"same function\": <true or false>"));
        assert!(prompt.contains("\"most similar\""));
    }

    #[test]
    fn repair_preamble_quotes_error_and_response() {
        let preamble = repair_preamble("expected value at line 1 column 1", "not json");
        assert!(preamble.starts_with("# Error Message"));
        assert!(preamble.contains("expected value at line 1 column 1"));
        assert!(preamble.contains("previously provided was:\n\nnot json"));
        assert!(preamble.ends_with("\n\n"));
    }
}
