use super::FloatType;

/// Interval of ray parameter values, `[min, max)`.
/// Narrows monotonically while a ray is traced.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Segment {
    pub min: FloatType,
    pub max: FloatType,
}

impl Segment {
    pub fn new(min: FloatType, max: FloatType) -> Segment {
        Segment { min, max }
    }

    /// Tests if the parameter lies in the segment, extended by eps on both ends.
    pub fn contains(&self, p: FloatType, eps: FloatType) -> bool {
        self.min <= p + eps && p - eps <= self.max
    }

    pub fn is_empty(&self, eps: FloatType) -> bool {
        self.max < self.min - eps
    }

    pub fn is_empty_strict(&self) -> bool {
        self.max < self.min
    }

    pub fn length(&self) -> FloatType {
        self.max - self.min
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;
    use test_case::test_case;

    #[test_case(0.0, 1.0, 0.5, 0.0, true ; "inside")]
    #[test_case(0.0, 1.0, 1.0, 0.0, true ; "at_max")]
    #[test_case(0.0, 1.0, 1.05, 0.0, false ; "past_max")]
    #[test_case(0.0, 1.0, 1.05, 0.1, true ; "past_max_within_eps")]
    #[test_case(0.0, 1.0, -0.05, 0.1, true ; "before_min_within_eps")]
    #[test_case(0.0, 1.0, -0.2, 0.1, false ; "before_min")]
    fn contains(min: f32, max: f32, p: f32, eps: f32, expected: bool) {
        assert!(Segment::new(min, max).contains(p, eps) == expected);
    }

    #[test]
    fn emptiness() {
        assert!(!Segment::new(1.0, 1.0).is_empty(0.0));
        assert!(Segment::new(1.0, 0.5).is_empty(0.1));
        assert!(!Segment::new(1.0, 0.95).is_empty(0.1));
        assert!(Segment::new(1.0, 0.95).is_empty_strict());
    }

    #[test]
    fn nan_segment_is_not_empty() {
        // NaN bounds come from rays parallel to a box slab and must not cull anything
        assert!(!Segment::new(f32::NAN, 1.0).is_empty_strict());
    }
}
