//! Conversion of loosely typed API payloads into the entity model.
//!
//! Every field is looked up under a fixed, case-sensitive key. The policy is
//! the same for every entity:
//!
//! - unknown keys are ignored,
//! - missing keys (and explicit `null`) take the zero value of the field,
//! - a key holding the wrong kind of value fails the whole decode.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{
    Account, Branch, Commit, CommitAuthor, Link, Page, PullRequest, Repository, Resource, Status,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unexpected response shape at `{field}`: expected {expected}, found {found}")]
pub struct DecodeError {
    /// Dotted path of the offending key, e.g. `source.branch.name`
    pub field: String,
    pub expected: &'static str,
    pub found: &'static str,
}

/// Entities that can be built from a JSON object.
pub trait Normalize: Sized {
    fn normalize(fields: &Fields<'_>) -> Result<Self, DecodeError>;
}

/// Decode a complete response payload into `T`.
pub fn normalize<T: Normalize>(value: &Value) -> Result<T, DecodeError> {
    let fields = match value {
        Value::Null => Fields::absent(String::new()),
        Value::Object(map) => Fields::present(map, String::new()),
        other => return Err(mismatch("<root>", "object", other)),
    };
    T::normalize(&fields)
}

/// Typed, defaulting accessors over one JSON object.
pub struct Fields<'a> {
    map: Option<&'a Map<String, Value>>,
    path: String,
}

impl<'a> Fields<'a> {
    fn present(map: &'a Map<String, Value>, path: String) -> Self {
        Self { map: Some(map), path }
    }

    fn absent(path: String) -> Self {
        Self { map: None, path }
    }

    fn path_of(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map
            .and_then(|m| m.get(key))
            .filter(|v| !v.is_null())
    }

    pub fn string(&self, key: &str) -> Result<String, DecodeError> {
        match self.get(key) {
            None => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(mismatch(&self.path_of(key), "string", other)),
        }
    }

    pub fn uint(&self, key: &str) -> Result<u64, DecodeError> {
        match self.get(key) {
            None => Ok(0),
            Some(value) => value
                .as_u64()
                .ok_or_else(|| mismatch(&self.path_of(key), "non-negative integer", value)),
        }
    }

    pub fn boolean(&self, key: &str) -> Result<bool, DecodeError> {
        match self.get(key) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(mismatch(&self.path_of(key), "boolean", other)),
        }
    }

    pub fn object<T: Normalize>(&self, key: &str) -> Result<T, DecodeError> {
        let path = self.path_of(key);
        match self.get(key) {
            None => T::normalize(&Fields::absent(path)),
            Some(Value::Object(map)) => T::normalize(&Fields::present(map, path)),
            Some(other) => Err(mismatch(&path, "object", other)),
        }
    }

    pub fn list<T: Normalize>(&self, key: &str) -> Result<Vec<T>, DecodeError> {
        let path = self.path_of(key);
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let item_path = format!("{}[{}]", path, i);
                    match item {
                        Value::Null => T::normalize(&Fields::absent(item_path)),
                        Value::Object(map) => T::normalize(&Fields::present(map, item_path)),
                        other => Err(mismatch(&item_path, "object", other)),
                    }
                })
                .collect(),
            Some(other) => Err(mismatch(&path, "array", other)),
        }
    }

    /// A `links` style object: link name to `{href, name}`.
    pub fn links(&self, key: &str) -> Result<BTreeMap<String, Link>, DecodeError> {
        let path = self.path_of(key);
        match self.get(key) {
            None => Ok(BTreeMap::new()),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(name, link)| {
                    let link_path = format!("{}.{}", path, name);
                    match link {
                        Value::Object(inner) => {
                            Link::normalize(&Fields::present(inner, link_path))
                                .map(|l| (name.clone(), l))
                        }
                        other => Err(mismatch(&link_path, "object", other)),
                    }
                })
                .collect(),
            Some(other) => Err(mismatch(&path, "object", other)),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(field: &str, expected: &'static str, found: &Value) -> DecodeError {
    DecodeError {
        field: field.to_string(),
        expected,
        found: kind_of(found),
    }
}

impl Normalize for PullRequest {
    fn normalize(f: &Fields<'_>) -> Result<Self, DecodeError> {
        Ok(PullRequest {
            id: f.uint("id")?,
            title: f.string("title")?,
            state: f.string("state")?.as_str().into(),
            source: f.object("source")?,
            destination: f.object("destination")?,
            kind: f.string("type")?,
            description: f.string("description")?,
            author: f.object("author")?,
            created_on: f.string("created_on")?,
            close_source_branch: f.boolean("close_source_branch")?,
            comment_count: f.uint("comment_count")?,
            task_count: f.uint("task_count")?,
            merge_commit: f.object("merge_commit")?,
            reviewers: f.list("reviewers")?,
            links: f.links("links")?,
        })
    }
}

impl Normalize for Resource {
    fn normalize(f: &Fields<'_>) -> Result<Self, DecodeError> {
        Ok(Resource {
            branch: f.object("branch")?,
            commit: f.object("commit")?,
            repository: f.object("repository")?,
        })
    }
}

impl Normalize for Branch {
    fn normalize(f: &Fields<'_>) -> Result<Self, DecodeError> {
        Ok(Branch {
            name: f.string("name")?,
        })
    }
}

impl Normalize for Commit {
    fn normalize(f: &Fields<'_>) -> Result<Self, DecodeError> {
        Ok(Commit {
            hash: f.string("hash")?,
            message: f.string("message")?,
            date: f.string("date")?,
            author: f.object("author")?,
        })
    }
}

impl Normalize for CommitAuthor {
    fn normalize(f: &Fields<'_>) -> Result<Self, DecodeError> {
        Ok(CommitAuthor {
            raw: f.string("raw")?,
            user: f.object("user")?,
        })
    }
}

impl Normalize for Repository {
    fn normalize(f: &Fields<'_>) -> Result<Self, DecodeError> {
        Ok(Repository {
            full_name: f.string("full_name")?,
            name: f.string("name")?,
            uuid: f.string("uuid")?,
        })
    }
}

impl Normalize for Account {
    fn normalize(f: &Fields<'_>) -> Result<Self, DecodeError> {
        Ok(Account {
            display_name: f.string("display_name")?,
            nickname: f.string("nickname")?,
            uuid: f.string("uuid")?,
        })
    }
}

impl Normalize for Link {
    fn normalize(f: &Fields<'_>) -> Result<Self, DecodeError> {
        Ok(Link {
            href: f.string("href")?,
            name: f.string("name")?,
        })
    }
}

impl Normalize for Status {
    fn normalize(f: &Fields<'_>) -> Result<Self, DecodeError> {
        Ok(Status {
            kind: f.string("type")?,
            uuid: f.string("uuid")?,
            key: f.string("key")?,
            refname: f.string("refname")?,
            url: f.string("url")?,
            state: f.string("state")?,
            name: f.string("name")?,
            description: f.string("description")?,
            created_on: f.string("created_on")?,
            updated_on: f.string("updated_on")?,
            links: f.links("links")?,
        })
    }
}

impl<T: Normalize> Normalize for Page<T> {
    fn normalize(f: &Fields<'_>) -> Result<Self, DecodeError> {
        Ok(Page {
            size: f.uint("size")?,
            page: f.uint("page")?,
            pagelen: f.uint("pagelen")?,
            next: f.string("next")?,
            previous: f.string("previous")?,
            values: f.list("values")?,
        })
    }
}
