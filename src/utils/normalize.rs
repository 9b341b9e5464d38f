/// Case- and whitespace-insensitive form of a question text, used as the
/// dedup key in the import pipeline. Paraphrases intentionally stay distinct.
pub fn normalized_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
