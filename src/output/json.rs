use anyhow::Result;
use serde::Serialize;

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::DEFAULT_CATALOG;

    #[test]
    fn catalog_renders_names_and_attributes() {
        let json = render_json(&DEFAULT_CATALOG[..]).expect("render catalog");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value[0]["name"], "Business Line");
        assert_eq!(value[8]["attributes"][0], "Region");
        assert!(json.contains('\n'));
    }
}
