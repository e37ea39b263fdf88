const ADD_PERSON_CALL: &str = "add_event_person";
const SPEAKER_ROLE: &str = "'speaker'";

/// Find the person id of the speaker in inline `add_event_person(..)` calls.
///
/// Arguments are positional: the third is the person id, the fourth the
/// role. The last speaker statement in the text wins; statements with too
/// few arguments are skipped.
pub fn speaker_id(text: &str) -> Option<String> {
    if !text.contains(ADD_PERSON_CALL) {
        return None;
    }

    text.split(';')
        .filter(|statement| statement.contains(ADD_PERSON_CALL))
        .filter_map(|statement| {
            let args: Vec<&str> = statement.split(',').collect();
            if args.len() < 4 {
                return None;
            }
            let role = args[3].trim().trim_end_matches(')').trim_end();
            (role == SPEAKER_ROLE).then(|| args[2].trim().trim_matches(['\'', '"']).to_string())
        })
        .last()
}
