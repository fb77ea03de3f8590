/// Builds the scoring prompt for one batch.
///
/// The response parser relies on the last instruction: one `word: score` line
/// per word and nothing else.
pub fn build_prompt<S: AsRef<str>>(compare_phrase: &str, words: &[S]) -> String {
    let mut prompt = format!(
        "You are a semantic scoring algorithm. For each word I provide, tell me its semantic \
similarity to the compare phrase \"{phrase}\" on a scale of -100% (not related at all, even a \
contrary or as different as possible meaning) to 100% (perfectly semantically related, completely \
synonymous with the meaning of the compare phrase). 0% is the boundary of being unrelated: anything \
under 0 (from -1% to -100%) means not semantically related to the compare phrase at all.\n\
\n\
Compare Phrase: {phrase}\n\
\n\
Words to compare and get a semantic relationship score to the idea of the compare phrase:",
        phrase = compare_phrase
    );

    for word in words {
        prompt.push_str("\n- ");
        prompt.push_str(word.as_ref());
    }

    prompt.push_str(
        "\n\nRespond with exactly one line per word in the form `word: score`, for example \
`ocean: 42%`. Give only the list, no other meta talk.",
    );
    prompt
}
