/*
 * The pure name-matching predicate. Given a file name and a parsed query,
 * decides whether the file satisfies the query. No state, no side effects,
 * no error conditions; everything stateful lives in the walker and session.
 */
use super::models::{Query, QueryMode};

/*
 * Returns true when `file_name` satisfies `query`.
 *
 * Substring mode: case-sensitive, byte-exact containment of the match text.
 * ExtensionExact mode: the portion of the name after the last '.' must equal
 * the match text exactly; a name without any '.' never matches.
 */
pub fn matches(file_name: &str, query: &Query) -> bool {
    match query.mode() {
        QueryMode::Substring => file_name.contains(query.match_text()),
        QueryMode::ExtensionExact => match file_name.rsplit_once('.') {
            Some((_, extension)) => extension == query.match_text(),
            None => false,
        },
    }
}
