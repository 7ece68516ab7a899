use std::str::FromStr;

use crate::constants::PAGE_SIZE;

use super::pagination::PageRequest;

pub type QueryData = Vec<(String, String)>;

/// Query string parameters. Keys may repeat (`?tags=a&tags=b`).
pub struct Form {
    inner: QueryData,
}

impl Form {
    pub fn from_data(data: QueryData) -> Self {
        Self { inner: data }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.to_owned())
            .collect()
    }

    pub fn get_number<T>(&self, key: &str) -> Option<T>
    where
        T: FromStr,
    {
        self.get_str(key).and_then(|v| v.trim().parse().ok())
    }

    /// `1`/`true` and `0`/`false`; anything else counts as absent.
    pub fn get_flag(&self, key: &str) -> Option<bool> {
        match self.get_str(key)?.trim() {
            "1" | "true" | "True" => Some(true),
            "0" | "false" | "False" => Some(false),
            _ => None,
        }
    }

    /// A positive integer, or `default` for anything else.
    pub fn get_positive(&self, key: &str, default: i64) -> i64 {
        parse_positive(self.get_str(key), default)
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(
            self.get_positive("page", 1),
            self.get_positive("limit", PAGE_SIZE),
        )
    }

    pub fn recipes_limit(&self) -> i64 {
        self.get_positive("recipes_limit", PAGE_SIZE)
    }
}

pub fn parse_positive(value: Option<&str>, default: i64) -> i64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn recipes_limit_falls_back_to_page_size() {
        assert_eq!(form(&[("recipes_limit", "3")]).recipes_limit(), 3);
        assert_eq!(form(&[("recipes_limit", "abc")]).recipes_limit(), PAGE_SIZE);
        assert_eq!(form(&[("recipes_limit", "0")]).recipes_limit(), PAGE_SIZE);
        assert_eq!(form(&[("recipes_limit", "-2")]).recipes_limit(), PAGE_SIZE);
        assert_eq!(form(&[]).recipes_limit(), PAGE_SIZE);
    }

    #[test]
    fn repeated_keys() {
        let f = form(&[("tags", "breakfast"), ("limit", "2"), ("tags", "lunch"), ("tags", "")]);
        assert_eq!(f.get_all("tags"), vec!["breakfast", "lunch"]);
        assert_eq!(f.get_number::<i64>("limit"), Some(2));
        assert_eq!(f.get_number::<i64>("author"), None);
    }

    #[test]
    fn flags() {
        let f = form(&[("is_favorited", "1"), ("is_in_shopping_cart", "maybe")]);
        assert_eq!(f.get_flag("is_favorited"), Some(true));
        assert_eq!(f.get_flag("is_in_shopping_cart"), None);
        assert_eq!(form(&[("is_favorited", "0")]).get_flag("is_favorited"), Some(false));
    }

    #[test]
    fn page_request_defaults() {
        let page = form(&[("page", "x")]).page_request();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, PAGE_SIZE);
    }
}
