use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        SemanticError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(SemanticError::decode("x").to_string().contains("decode error:"));
    assert!(
        SemanticError::composite("x")
            .to_string()
            .contains("composite error:")
    );
    assert!(
        SemanticError::detection("x")
            .to_string()
            .contains("detection error:")
    );
    assert!(SemanticError::media("x").to_string().contains("media error:"));
    assert!(
        SemanticError::pipeline("x")
            .to_string()
            .contains("pipeline error:")
    );
}

#[test]
fn composable_inputs_message_names_the_detail() {
    let err = SemanticError::composable_inputs_required("background has zero extent");
    let msg = err.to_string();
    assert!(msg.contains("composable inputs required"));
    assert!(msg.contains("background has zero extent"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = SemanticError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
