use tamshai_types::prelude::CallerIdentity;

/// Instructions that do not depend on the data context. Kept separate from the
/// context block so the context block can be marked cacheable on its own.
pub fn instructions(caller: &CallerIdentity) -> String {
    let roles = if caller.roles.is_empty() {
        "none".to_string()
    } else {
        caller.roles.join(", ")
    };
    format!(
        "You are an enterprise assistant answering questions for {name} (roles: {roles}).\n\
         Answer only from the data provided below. If the data does not contain the answer, say so.\n\
         When a data block is marked incomplete, tell the user that more records exist.\n\
         Never reveal data from sources that are not present in the provided data.",
        name = caller.username,
    )
}

pub fn context_block(context: &str) -> String {
    if context.is_empty() {
        "No data sources returned data for this request.".to_string()
    } else {
        format!("Available data:\n\n{context}")
    }
}

/// `[Data from x]` labels present in a context string, in order.
pub fn data_sources(context: &str) -> Vec<&str> {
    context
        .lines()
        .filter_map(|line| {
            line.strip_prefix("[Data from ")
                .and_then(|rest| rest.strip_suffix(']'))
        })
        .collect()
}
