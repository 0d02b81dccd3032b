/// Normalises extracted page text: unifies line endings, turns tabs into
/// spaces, trims every line and drops the blank ones.
pub fn clean_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\t', " ")
        .split('\n')
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Number of whitespace-delimited words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_normalises_lines() {
        let raw = "  Title\r\n\r\n\tbody line  \rlast";
        assert_eq!(clean_text(raw), "Title\nbody line\nlast");
    }

    #[test]
    fn test_clean_text_blank_input() {
        assert_eq!(clean_text(" \n\t\r\n "), "");
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("a  b\nc\td"), 4);
        assert_eq!(word_count(""), 0);
    }
}
