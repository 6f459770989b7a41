use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Feature {
    Scalar(f32),
    Flag(bool),
}

/// Insertion-checked feature map, created fresh for every computation cycle.
///
/// Each registered detector writes its outputs here under fixed names and a
/// visualizer consumes the result. Writing the same name twice in one cycle
/// is a programming defect, as is reading a name nothing published - both
/// panic rather than silently defaulting.
#[derive(Debug, Default)]
pub struct FeatureSet {
    values: HashMap<&'static str, Feature>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_scalar(&mut self, name: &'static str, value: f32) {
        if self.values.insert(name, Feature::Scalar(value)).is_some() {
            panic!("feature '{}' registered twice in one cycle", name);
        }
    }

    pub fn put_flag(&mut self, name: &'static str, value: bool) {
        if self.values.insert(name, Feature::Flag(value)).is_some() {
            panic!("feature '{}' registered twice in one cycle", name);
        }
    }

    pub fn scalar(&self, name: &str) -> f32 {
        match self.values.get(name) {
            Some(Feature::Scalar(v)) => *v,
            Some(Feature::Flag(_)) => panic!("feature '{}' is a flag, not a scalar", name),
            None => panic!("feature '{}' was never published this cycle", name),
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        match self.values.get(name) {
            Some(Feature::Flag(v)) => *v,
            Some(Feature::Scalar(_)) => panic!("feature '{}' is a scalar, not a flag", name),
            None => panic!("feature '{}' was never published this cycle", name),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_reads_back() {
        let mut features = FeatureSet::new();
        features.put_scalar("bass", 0.7);
        features.put_flag("silence", false);

        assert_eq!(features.scalar("bass"), 0.7);
        assert!(!features.flag("silence"));
        assert!(features.contains("bass"));
        assert!(!features.contains("clap"));
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn duplicate_registration_panics() {
        let mut features = FeatureSet::new();
        features.put_scalar("bass", 0.1);
        features.put_scalar("bass", 0.2);
    }

    #[test]
    #[should_panic(expected = "never published")]
    fn missing_feature_panics() {
        let features = FeatureSet::new();
        features.scalar("bass");
    }

    #[test]
    #[should_panic(expected = "is a flag")]
    fn type_mismatch_panics() {
        let mut features = FeatureSet::new();
        features.put_flag("silence", true);
        features.scalar("silence");
    }
}
