//! The single conversion point between major currency units (what donors
//! type and what rows store) and the processor's minor units. Each amount
//! must cross this boundary exactly once per direction.

pub fn to_minor_units(major: f64) -> i64 {
    (major * 100.0).round() as i64
}

pub fn to_major_units(minor: i64) -> f64 {
    minor as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_dollars_convert_to_cents() {
        assert_eq!(to_minor_units(25.0), 2500);
        assert_eq!(to_minor_units(1.0), 100);
    }

    #[test]
    fn fractional_amounts_round_to_nearest_cent() {
        assert_eq!(to_minor_units(19.99), 1999);
        assert_eq!(to_minor_units(0.1), 10);
        // binary float artifacts must not shave a cent off
        assert_eq!(to_minor_units(29.35), 2935);
    }

    #[test]
    fn minor_units_convert_back_to_major() {
        assert_eq!(to_major_units(2500), 25.0);
        assert_eq!(to_major_units(1999), 19.99);
    }

    #[test]
    fn conversion_is_not_applied_twice() {
        let major = 25.0;
        assert_eq!(to_major_units(to_minor_units(major)), major);
    }
}
