//! The fixed emotion label set the worker classifies into.

/// Emotion categories, in the order the model was trained on.
pub const EMOTION_LABELS: [&str; 8] = [
    "anger", "disgust", "fear", "joy", "neutral", "sadness", "shame", "surprise",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_sorted_and_unique() {
        let mut sorted = EMOTION_LABELS.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted, EMOTION_LABELS.to_vec());
    }

    #[test]
    fn labels_have_eight_entries() {
        assert_eq!(EMOTION_LABELS.len(), 8);
    }
}
