use std::collections::HashMap;

use pictor_core::{Error, Result, config::LimitsConfig};

use crate::transform::{Operation, Transform};

const INVALID_DIMENSIONS: &str = "Invalid dimensions";
const INVALID_SIGMA: &str = "Invalid sigma";
const INVALID_PERCENTAGE: &str = "Invalid percentage";

/// Raw query parameters of a transform request.
#[derive(Debug, Default, Clone)]
pub struct Params(HashMap<String, String>);

impl From<HashMap<String, String>> for Params {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Params {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl Params {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn required(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| Error::invalid(format!("Missing parameter: {key}")))
    }

    /// A strictly positive integer made of ASCII digits only, at most `max`.
    pub fn positive(&self, key: &str, message: &str, max: u32) -> Result<u32> {
        let raw = self.required(key)?;
        let value = parse_positive(raw).ok_or_else(|| Error::invalid(message))?;
        if value > max {
            return Err(Error::invalid(format!(
                "{message}: {key} must be at most {max}"
            )));
        }
        Ok(value)
    }
}

fn parse_positive(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u32>().ok().filter(|value| *value > 0)
}

impl Transform {
    /// Validates and coerces the numeric parameters of `operation`. Runs before
    /// any storage access.
    pub fn from_params(
        operation: Operation,
        params: &Params,
        limits: &LimitsConfig,
    ) -> Result<Self> {
        let kernel = |key: &str| params.positive(key, INVALID_DIMENSIONS, limits.max_kernel);

        let transform = match operation {
            Operation::Resize => Transform::Resize {
                width: params.positive("width", INVALID_DIMENSIONS, limits.max_dimension)?,
                height: params.positive("height", INVALID_DIMENSIONS, limits.max_dimension)?,
            },
            Operation::Blur => Transform::BoxBlur {
                kernel_width: kernel("kernel_width")?,
                kernel_height: kernel("kernel_height")?,
            },
            Operation::GaussianBlur => Transform::GaussianBlur {
                kernel_width: kernel("kernel_width")?,
                kernel_height: kernel("kernel_height")?,
                sigma: params.positive("sigmaX", INVALID_SIGMA, limits.max_kernel)?,
            },
            Operation::MedianBlur => Transform::MedianBlur {
                kernel: params.positive("percentage", INVALID_PERCENTAGE, limits.max_kernel)?,
            },
            Operation::Grayscale => Transform::Grayscale,
        };
        Ok(transform)
    }
}

#[cfg(test)]
mod tests {
    use pictor_core::{ErrorCode, config::LimitsConfig};

    use super::{Params, parse_positive};
    use crate::transform::{Operation, Transform};

    fn parse(operation: Operation, params: Params) -> pictor_core::Result<Transform> {
        Transform::from_params(operation, &params, &LimitsConfig::default())
    }

    #[test]
    fn positive_integers_only() {
        assert_eq!(parse_positive("50"), Some(50));
        assert_eq!(parse_positive("007"), Some(7));
        for raw in ["", "0", "000", "-3", "+3", " 3", "3 ", "3.0", "abc", "1e3", "99999999999"] {
            assert_eq!(parse_positive(raw), None, "{raw:?} should be rejected");
        }
    }

    #[test]
    fn resize_parses_dimensions() {
        let transform = parse(
            Operation::Resize,
            Params::from([("width", "50"), ("height", "40"), ("filename", "x.png")]),
        )
        .unwrap();
        assert_eq!(transform, Transform::Resize { width: 50, height: 40 });
    }

    #[test]
    fn zero_width_is_invalid() {
        let err = parse(Operation::Resize, Params::from([("width", "0"), ("height", "10")]))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParameter);
        assert_eq!(err.to_string(), "Invalid dimensions");
    }

    #[test]
    fn non_numeric_kernel_is_invalid() {
        let err = parse(
            Operation::Blur,
            Params::from([("kernel_width", "abc"), ("kernel_height", "3")]),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParameter);
        assert_eq!(err.to_string(), "Invalid dimensions");
    }

    #[test]
    fn gaussian_requires_sigma() {
        let err = parse(
            Operation::GaussianBlur,
            Params::from([("kernel_width", "3"), ("kernel_height", "3")]),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing parameter: sigmaX");

        let err = parse(
            Operation::GaussianBlur,
            Params::from([("kernel_width", "3"), ("kernel_height", "3"), ("sigmaX", "x")]),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid sigma");
    }

    #[test]
    fn median_uses_percentage_as_kernel() {
        let transform = parse(Operation::MedianBlur, Params::from([("percentage", "5")])).unwrap();
        assert_eq!(transform, Transform::MedianBlur { kernel: 5 });

        let err = parse(Operation::MedianBlur, Params::from([("percentage", "-5")])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid percentage");
    }

    #[test]
    fn limits_are_enforced() {
        let err = parse(
            Operation::Resize,
            Params::from([("width", "10001"), ("height", "10")]),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParameter);
        assert!(err.to_string().starts_with("Invalid dimensions"), "{err}");
    }

    #[test]
    fn grayscale_takes_no_numbers() {
        assert_eq!(
            parse(Operation::Grayscale, Params::default()).unwrap(),
            Transform::Grayscale
        );
    }
}
