//! User references embedded in commits, pull requests and issues.

use std::collections::HashMap;

use serde_json::Value;

/// Collect the user object referenced by each item.
///
/// Reads `user` when present and non-null, otherwise `author` when present and
/// non-null. Items with neither contribute nothing.
pub fn extract_users<'a>(items: impl IntoIterator<Item = &'a Value>) -> Vec<Value> {
    items
        .into_iter()
        .filter_map(|item| {
            non_null(item.get("user")).or_else(|| non_null(item.get("author")))
        })
        .cloned()
        .collect()
}

/// Collapse users sharing a login into one record.
///
/// The record seen last wins; it takes the slot where the login first appeared.
/// Users without a string `login` cannot be keyed and are dropped.
pub fn dedupe_users(users: Vec<Value>) -> Vec<Value> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Value> = Vec::new();

    for user in users {
        let Some(login) = user.get("login").and_then(Value::as_str) else {
            continue;
        };

        match slots.get(login) {
            Some(&slot) => unique[slot] = user,
            None => {
                slots.insert(login.to_string(), unique.len());
                unique.push(user);
            }
        }
    }

    unique
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}
