//! Schema field-path resolver
//!
//! Turns a dot-free camel field name into a dotted path by walking the
//! schema: `provinciaPaisCountryCode` on `Empleado` becomes
//! `provincia.pais.countryCode` when `Empleado.provincia -> Provincia`,
//! `Provincia.pais -> Pais` and `Pais.countryCode` exist.
//!
//! At each level the longest token prefix naming a field wins, falling back
//! to shorter prefixes when the remainder cannot be resolved below it.

use crate::schema::{lower_first, Schema, TypeDef};

use super::tokenizer::split_camel;

/// Resolves `field` against `root`, returning the dotted path.
///
/// Dotted input (`provincia.nombre`) is resolved segment by segment.
/// On failure returns the unresolved remainder from the deepest level the
/// walk reached, in lower camel form.
pub fn resolve_path<'s>(schema: &'s Schema, root: &'s TypeDef, field: &str) -> Result<String, String> {
    let mut current = root;
    let mut path: Vec<String> = Vec::new();
    let segments: Vec<&str> = field.split('.').collect();

    for (i, segment) in segments.iter().enumerate() {
        let tokens = split_camel(segment);
        if tokens.is_empty() {
            return Err(field.to_string());
        }
        let resolved = resolve_tokens(schema, current, &tokens)?;

        if i + 1 < segments.len() {
            // Descend for the next dotted segment
            current = walk(schema, current, &resolved).ok_or_else(|| segments[i + 1].to_string())?;
        }
        path.extend(resolved);
    }

    Ok(path.join("."))
}

fn resolve_tokens(schema: &Schema, type_def: &TypeDef, tokens: &[&str]) -> Result<Vec<String>, String> {
    let mut deepest = lower_first(&tokens.concat());

    for k in (1..=tokens.len()).rev() {
        let candidate = lower_first(&tokens[..k].concat());
        let field = match type_def.field_loose(&candidate) {
            Some(f) => f,
            None => continue,
        };

        if k == tokens.len() {
            return Ok(vec![field.name.clone()]);
        }

        let target = match field.reference_target().and_then(|t| schema.get_type(t)) {
            Some(t) => t,
            None => continue,
        };

        match resolve_tokens(schema, target, &tokens[k..]) {
            Ok(rest) => {
                let mut path = vec![field.name.clone()];
                path.extend(rest);
                return Ok(path);
            }
            Err(remainder) => {
                if remainder.len() < deepest.len() {
                    deepest = remainder;
                }
            }
        }
    }

    Err(deepest)
}

/// Follows an already-resolved path to the type it ends on
fn walk<'s>(schema: &'s Schema, root: &'s TypeDef, path: &[String]) -> Option<&'s TypeDef> {
    let mut current = root;
    for name in path {
        let target = current.field(name)?.reference_target()?;
        current = schema.get_type(target)?;
    }
    Some(current)
}
