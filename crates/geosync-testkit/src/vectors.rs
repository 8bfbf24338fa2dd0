//! Golden test vectors for canonical encoding and content hashing.
//!
//! Clients precompute `?hash=` values from these rules, so the canonical
//! bytes and the SHA-256 of them must stay fixed across releases.

use geosync_core::{canonical_string, HashAlgorithm, Payload};
use serde_json::Value;

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct CanonicalVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// JSON input, in any formatting.
    pub input: &'static str,
    /// Expected canonical text.
    pub canonical: &'static str,
    /// Expected SHA-256 of the canonical text (hex).
    pub sha256: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<CanonicalVector> {
    vec![
        CanonicalVector {
            name: "empty object",
            input: "{ }",
            canonical: "{}",
            sha256: "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
        },
        CanonicalVector {
            name: "empty array",
            input: "[\n]",
            canonical: "[]",
            sha256: "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945",
        },
        CanonicalVector {
            name: "unsorted keys and literals",
            input: r#"{"c": "x", "b": [true, false, null], "a": 1}"#,
            canonical: r#"{"a":1,"b":[true,false,null],"c":"x"}"#,
            sha256: "134a0bdc0f430c1e870c65399637eec4f9543c0d0a44942f3846af621833010a",
        },
        CanonicalVector {
            name: "region triangle with float coordinates",
            input: r#"[{"y": 0.0, "x": 0.0}, {"x": 1.0, "y": -0.0}, {"x": 1, "y": 1.0}]"#,
            canonical: r#"[{"x":0,"y":0},{"x":1,"y":0},{"x":1,"y":1}]"#,
            sha256: "6a5d3061cf28aa3434892e10de96f74afb3ca6b2ff452156d5816e81ece40c29",
        },
        CanonicalVector {
            name: "region triangle after move",
            input: r#"[{"x":0,"y":0},{"x":1,"y":0},{"x":2.0,"y":2.0}]"#,
            canonical: r#"[{"x":0,"y":0},{"x":1,"y":0},{"x":2,"y":2}]"#,
            sha256: "d4f5c4579a0d57b3412d747568518e26807ed7df14dfb35f69ec122af466bed3",
        },
        CanonicalVector {
            name: "escaped string",
            input: r#""é\n""#,
            canonical: "\"\u{e9}\\n\"",
            sha256: "d7cacaecd26f631e9e758a76af59fe7887cb0ec8b0e5d54ff7012653c2c5de95",
        },
        CanonicalVector {
            name: "example polygon",
            input: r#"[
                {"x": 13.534254900484356, "y": 59.36163702557852},
                {"x": 13.553743899236425, "y": 59.35326638347115},
                {"x": 13.545203776187767, "y": 59.33897571908756},
                {"x": 13.523962957323153, "y": 59.3386407095081},
                {"x": 13.529875350202992, "y": 59.34902447016282},
                {"x": 13.523525002295015, "y": 59.3541593503185},
                {"x": 13.534254900484356, "y": 59.36163702557852}
            ]"#,
            canonical: concat!(
                r#"[{"x":13.534254900484356,"y":59.36163702557852},"#,
                r#"{"x":13.553743899236425,"y":59.35326638347115},"#,
                r#"{"x":13.545203776187767,"y":59.33897571908756},"#,
                r#"{"x":13.523962957323153,"y":59.3386407095081},"#,
                r#"{"x":13.529875350202992,"y":59.34902447016282},"#,
                r#"{"x":13.523525002295015,"y":59.3541593503185},"#,
                r#"{"x":13.534254900484356,"y":59.36163702557852}]"#,
            ),
            sha256: "5d7e2acd6346602779b7fb369b4267641292533e1e7c600c98e91cd3df60bcec",
        },
    ]
}

/// Check one vector, returning a description of the first mismatch.
pub fn verify_vector(vector: &CanonicalVector) -> Result<(), String> {
    let value: Value = serde_json::from_str(vector.input)
        .map_err(|e| format!("{}: input does not parse: {}", vector.name, e))?;

    let canonical = canonical_string(&value);
    if canonical != vector.canonical {
        return Err(format!(
            "{}: canonical mismatch\n  expected: {}\n  actual:   {}",
            vector.name, vector.canonical, canonical
        ));
    }

    let hash = value.content_hash(HashAlgorithm::Sha256).to_hex();
    if hash != vector.sha256 {
        return Err(format!(
            "{}: hash mismatch\n  expected: {}\n  actual:   {}",
            vector.name, vector.sha256, hash
        ));
    }

    Ok(())
}

/// Verify all golden vectors.
pub fn verify_all_vectors() -> Result<(), String> {
    for vector in all_vectors() {
        verify_vector(&vector)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_hold() {
        verify_all_vectors().unwrap();
    }

    #[test]
    fn test_vector_names_unique() {
        let vectors = all_vectors();
        let mut names: Vec<_> = vectors.iter().map(|v| v.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), vectors.len());
    }

    #[test]
    fn test_mismatch_is_reported() {
        let bad = CanonicalVector {
            name: "wrong",
            input: "[1]",
            canonical: "[2]",
            sha256: "",
        };
        let err = verify_vector(&bad).unwrap_err();
        assert!(err.contains("canonical mismatch"));
    }
}
