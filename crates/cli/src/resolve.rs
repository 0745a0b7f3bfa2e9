//! Session lookup by exact id or unique id prefix.

use faustus_core::Session;

/// Outcome of looking up a session id typed on the command line.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Index into the session list.
    Found(usize),
    Missing,
    /// Every id the prefix matched.
    Ambiguous(Vec<String>),
}

/// Find `id` among `sessions`. An exact match wins over prefix matches.
pub fn resolve(sessions: &[Session], id: &str) -> Resolution {
    if id.is_empty() {
        return Resolution::Missing;
    }
    if let Some(index) = sessions.iter().position(|s| s.session_id == id) {
        return Resolution::Found(index);
    }

    let matches: Vec<usize> = sessions
        .iter()
        .enumerate()
        .filter(|(_, s)| s.session_id.starts_with(id))
        .map(|(index, _)| index)
        .collect();
    match matches.as_slice() {
        [] => Resolution::Missing,
        [index] => Resolution::Found(*index),
        _ => Resolution::Ambiguous(
            matches
                .iter()
                .map(|&index| sessions[index].session_id.clone())
                .collect(),
        ),
    }
}
