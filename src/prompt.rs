use crate::error::RelayError;

/// Merge the user's message and the extracted file text into one prompt.
///
/// Both present: `"{user}\n\nFile Content:\n{file}"`. One present: that one,
/// verbatim. Neither (or both blank): `EmptyInput`. Pure and deterministic.
pub fn assemble(
    user_text: Option<&str>,
    file_text: Option<&str>,
) -> Result<String, RelayError> {
    let user = user_text.filter(|t| !t.is_empty());
    let file = file_text.filter(|t| !t.is_empty());

    match (user, file) {
        (Some(u), Some(f)) => Ok(format!("{u}\n\nFile Content:\n{f}")),
        (Some(u), None) => Ok(u.to_string()),
        (None, Some(f)) => Ok(f.to_string()),
        (None, None) => Err(RelayError::EmptyInput),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_present_concatenates_with_marker() {
        let prompt = assemble(Some("summarize this"), Some("Invoice #42")).unwrap();
        assert_eq!(prompt, "summarize this\n\nFile Content:\nInvoice #42");
    }

    #[test]
    fn message_only_is_verbatim() {
        assert_eq!(assemble(Some("hello"), None).unwrap(), "hello");
    }

    #[test]
    fn file_only_is_verbatim_with_no_marker() {
        assert_eq!(assemble(None, Some("Invoice #42")).unwrap(), "Invoice #42");
    }

    #[test]
    fn neither_is_empty_input() {
        assert!(matches!(assemble(None, None), Err(RelayError::EmptyInput)));
    }

    #[test]
    fn blank_strings_count_as_absent() {
        assert!(matches!(
            assemble(Some(""), Some("")),
            Err(RelayError::EmptyInput)
        ));
        assert_eq!(assemble(Some(""), Some("x")).unwrap(), "x");
    }
}
