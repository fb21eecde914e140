//! Serde binding with the failing path in error messages.
use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use crate::error::DeserializeError;
use crate::store::ArgStore;

impl ArgStore {
    /// Deserializes the [`ArgStore::snapshot`] into `T`. Unset values arrive
    /// as `null`, so optional fields should be `Option`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, DeserializeError> {
        from_value_with_path(Json::Object(self.snapshot()))
    }
}

pub fn from_value_with_path<T: DeserializeOwned>(value: Json) -> Result<T, DeserializeError> {
    Ok(serde_path_to_error::deserialize(value)?)
}

pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, DeserializeError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    Ok(serde_path_to_error::deserialize(de)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_from;
    use crate::env::MapEnv;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Service {
        name: String,
        port: Option<i64>,
        hosts: Vec<Option<String>>,
    }

    fn store(pairs: &[(&str, &str)]) -> ArgStore {
        decode_from(pairs.iter().copied().collect::<MapEnv>()).unwrap()
    }

    #[test]
    fn deserializes_snapshot() {
        let store = store(&[
            ("OMNI_ARG_LIST", "name port hosts"),
            ("OMNI_ARG_NAME_TYPE", "str"),
            ("OMNI_ARG_NAME_VALUE", "api"),
            ("OMNI_ARG_PORT_TYPE", "int"),
            ("OMNI_ARG_HOSTS_TYPE", "str/2"),
            ("OMNI_ARG_HOSTS_VALUE_1", "b"),
        ]);
        let service: Service = store.deserialize().unwrap();
        assert_eq!(
            service,
            Service { name: "api".into(), port: None, hosts: vec![None, Some("b".into())] }
        );
    }

    #[test]
    fn errors_carry_the_path() {
        let store = store(&[
            ("OMNI_ARG_LIST", "name port hosts"),
            ("OMNI_ARG_NAME_TYPE", "str"),
            ("OMNI_ARG_PORT_TYPE", "str"),
            ("OMNI_ARG_PORT_VALUE", "eighty"),
            ("OMNI_ARG_HOSTS_TYPE", "str/0"),
        ]);
        let err = store.deserialize::<Service>().unwrap_err();
        assert_eq!(err.path, "name");

        let err = from_str_with_path::<Service>(r#"{"name": "x", "port": "eighty", "hosts": []}"#).unwrap_err();
        assert_eq!(err.path, "port");
        assert!(err.to_string().starts_with("at path port"));
    }
}
