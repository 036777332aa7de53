//! ARFF header parsing.
//!
//! Only the header matters here: `@relation`, `@attribute` lines and the
//! `@data` marker. Anything after `@data` is ignored.

use super::ClassifierError;

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    Numeric,
    Nominal(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

/// Attribute layout the model was trained against.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
    pub relation: String,
    pub attributes: Vec<Attribute>,
}

impl ModelSchema {
    pub fn parse(source: &str) -> Result<Self, ClassifierError> {
        let mut relation = None;
        let mut attributes = Vec::new();

        for (idx, raw) in source.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('%') {
                continue;
            }

            let (keyword, rest) = split_keyword(line);
            match keyword.to_ascii_lowercase().as_str() {
                "@relation" => relation = Some(unquote(rest).to_string()),
                "@attribute" => attributes.push(parse_attribute(rest, line_no)?),
                "@data" => break,
                _ => {
                    return Err(ClassifierError::SchemaParse {
                        line: line_no,
                        reason: format!("unexpected line: {line}"),
                    })
                }
            }
        }

        if attributes.is_empty() {
            return Err(ClassifierError::SchemaParse {
                line: 0,
                reason: "schema declares no attributes".into(),
            });
        }

        Ok(Self {
            relation: relation.unwrap_or_default(),
            attributes,
        })
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

fn split_keyword(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((kw, rest)) => (kw, rest.trim()),
        None => (line, ""),
    }
}

fn parse_attribute(rest: &str, line: usize) -> Result<Attribute, ClassifierError> {
    let (name, type_spec) = split_name(rest).ok_or_else(|| ClassifierError::SchemaParse {
        line,
        reason: format!("attribute without a type: {rest}"),
    })?;

    let kind = if type_spec.starts_with('{') {
        let inner = type_spec
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| ClassifierError::SchemaParse {
                line,
                reason: format!("unterminated nominal values for {name}"),
            })?;
        let values: Vec<String> = inner
            .split(',')
            .map(|v| unquote(v.trim()).to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            return Err(ClassifierError::SchemaParse {
                line,
                reason: format!("nominal attribute {name} has no values"),
            });
        }
        AttributeKind::Nominal(values)
    } else {
        match type_spec.to_ascii_lowercase().as_str() {
            "numeric" | "real" | "integer" => AttributeKind::Numeric,
            other => {
                return Err(ClassifierError::SchemaParse {
                    line,
                    reason: format!("unsupported attribute type {other} for {name}"),
                })
            }
        }
    };

    Ok(Attribute {
        name: name.to_string(),
        kind,
    })
}

/// Split `name type` where the name may be quoted.
fn split_name(rest: &str) -> Option<(&str, &str)> {
    let rest = rest.trim();
    if let Some(quote) = rest.chars().next().filter(|c| *c == '\'' || *c == '"') {
        let body = &rest[1..];
        let end = body.find(quote)?;
        let type_spec = body[end + 1..].trim();
        (!type_spec.is_empty()).then_some((&body[..end], type_spec))
    } else {
        let (name, type_spec) = rest.split_once(char::is_whitespace)?;
        Some((name, type_spec.trim()))
    }
}

fn unquote(s: &str) -> &str {
    s.trim_matches(|c| c == '\'' || c == '"')
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = include_str!("../../../resources/models/health_risk.arff");

    #[test]
    fn parses_shipped_header() {
        let schema = ModelSchema::parse(HEADER).unwrap();
        assert_eq!(schema.relation, "health_risk");
        assert_eq!(schema.attributes.len(), 6);
        assert_eq!(schema.attributes[0].name, "blood_sugar");
        assert_eq!(schema.attributes[0].kind, AttributeKind::Numeric);
        assert_eq!(
            schema.attribute("health_risk").unwrap().kind,
            AttributeKind::Nominal(vec![
                "NORMAL".into(),
                "MODERATE".into(),
                "HIGH".into(),
                "CRITICAL".into()
            ])
        );
    }

    #[test]
    fn quoted_names_and_values() {
        let schema = ModelSchema::parse(
            "@RELATION 'risk data'\n@ATTRIBUTE 'blood sugar' REAL\n@attribute risk {'NORMAL', 'HIGH'}\n",
        )
        .unwrap();
        assert_eq!(schema.relation, "risk data");
        assert_eq!(schema.attributes[0].name, "blood sugar");
        assert_eq!(
            schema.attributes[1].kind,
            AttributeKind::Nominal(vec!["NORMAL".into(), "HIGH".into()])
        );
    }

    #[test]
    fn data_section_is_ignored() {
        let schema =
            ModelSchema::parse("@relation r\n@attribute x numeric\n@data\n1\n2\nnot a header\n")
                .unwrap();
        assert_eq!(schema.attributes.len(), 1);
    }

    #[test]
    fn empty_schema_is_rejected() {
        let err = ModelSchema::parse("% nothing here\n@relation r\n@data\n").unwrap_err();
        assert!(matches!(err, ClassifierError::SchemaParse { .. }));
    }

    #[test]
    fn unsupported_type_reports_line() {
        let err = ModelSchema::parse("@relation r\n@attribute note string\n").unwrap_err();
        match err {
            ClassifierError::SchemaParse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unterminated_nominal_is_rejected() {
        assert!(ModelSchema::parse("@attribute risk {NORMAL,HIGH\n").is_err());
    }
}
