//! Canonical serialization of an audit entry.
//!
//! The hash of an entry is only verifiable if the exact bytes that were
//! hashed can be rebuilt later from the stored fields, by any process, on
//! any platform.  The canonical form is:
//!
//! * a single JSON object holding every entry field except `hash`, listed
//!   explicitly below so nothing is accidentally omitted
//! * object keys sorted by UTF-8 byte order at every nesting level
//!   (including inside `before`, `after`, and `metadata`)
//! * no insignificant whitespace
//! * strings escaped exactly as `serde_json` escapes them; Unicode is
//!   hashed as stored, with no normalization
//! * numbers rendered as `serde_json` renders them: integers in decimal,
//!   floats in shortest round-trip form (`1.0` and `1` are distinct)
//! * absent optionals rendered as `null`; absent and `null` are the same
//! * `created_at` as RFC 3339 UTC with exactly six fractional digits and a
//!   `Z` suffix, e.g. `2026-03-01T12:00:00.000000Z`

use std::fmt::Write as _;

use chrono::SecondsFormat;
use serde_json::{Map, Value};

use tessera_contracts::{
    entry::AuditEntry,
    error::{LedgerError, LedgerResult},
};

/// Render every field of `entry` except `hash` in canonical form.
pub fn canonical_bytes(entry: &AuditEntry) -> LedgerResult<Vec<u8>> {
    let opt_str = |s: &Option<String>| s.clone().map_or(Value::Null, Value::String);
    let opt_val = |v: &Option<Value>| v.clone().unwrap_or(Value::Null);

    let mut fields = Map::new();
    fields.insert("id".into(), Value::String(entry.id.to_string()));
    fields.insert("tenant_id".into(), Value::String(entry.tenant_id.to_string()));
    fields.insert("actor_id".into(), Value::String(entry.actor_id.clone()));
    fields.insert("actor_type".into(), Value::String(entry.actor_type.to_string()));
    fields.insert("actor_name".into(), Value::String(entry.actor_name.clone()));
    fields.insert("actor_email".into(), opt_str(&entry.actor_email));
    fields.insert("action".into(), Value::String(entry.action.clone()));
    fields.insert("entity".into(), opt_str(&entry.entity));
    fields.insert("entity_id".into(), opt_str(&entry.entity_id));
    fields.insert("before".into(), opt_val(&entry.before));
    fields.insert("after".into(), opt_val(&entry.after));
    fields.insert("metadata".into(), opt_val(&entry.metadata));
    fields.insert(
        "created_at".into(),
        Value::String(entry.created_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
    );
    fields.insert("seq".into(), Value::from(entry.seq));
    fields.insert("prev_hash".into(), Value::String(entry.prev_hash.clone()));

    let mut out = String::new();
    write_canonical(&mut out, &Value::Object(fields))?;
    Ok(out.into_bytes())
}

/// Write `value` in canonical JSON form.
pub fn write_canonical(out: &mut String, value: &Value) -> LedgerResult<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write!(out, "{}", n).map_err(|e| LedgerError::Serialization {
            reason: e.to_string(),
        })?,
        Value::String(s) => out.push_str(&serde_json::to_string(s)?),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(out, &map[key])?;
            }
            out.push('}');
        }
    }
    Ok(())
}
