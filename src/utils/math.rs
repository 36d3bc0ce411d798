use num_traits::{Float, FloatConst};

#[macro_export]
macro_rules! signed_mod {
    ($dividend:expr, $divisor:expr) => {
        (($dividend % $divisor) + $divisor) % $divisor
    };
}
#[macro_export]
macro_rules! lerp {
    ($value1:expr, $value2:expr, $t:expr) => {
        $value1 + ($value2 - $value1) * $t
    };
}

#[macro_export]
macro_rules! ilerp {
    ($value1:expr, $value2:expr, $inter:expr) => {
        ($inter - $value1) / ($value2 - $value1)
    };
}

/// Wraps an angle in radians into `(-π, π]`.
pub fn wrap_angle<T: Float + FloatConst>(angle: T) -> T {
    if angle > -T::PI() && angle <= T::PI() {
        return angle;
    }
    let tau = T::PI() + T::PI();
    let wrapped = signed_mod!(angle + T::PI(), tau) - T::PI();
    if wrapped <= -T::PI() {
        wrapped + tau
    } else {
        wrapped
    }
}

/// Shortest signed rotation that takes `current` onto `target`, in `(-π, π]`.
pub fn angle_error<T: Float + FloatConst>(target: T, current: T) -> T {
    wrap_angle(target - current)
}

/// Interpolates between two headings along the shorter arc.
///
/// Naive linear blending of 179° and -179° lands on 0°; this lands on 180°.
pub fn lerp_angle<T: Float + FloatConst>(from: T, to: T, t: T) -> T {
    wrap_angle(from + angle_error(to, from) * t)
}

/// Weight given to a correction with standard deviation `std_dev`.
///
/// An infinite deviation contributes nothing.
pub fn confidence_weight(std_dev: f64) -> f64 {
    if std_dev.is_infinite() {
        0.0
    } else {
        1.0 / (1.0 + std_dev)
    }
}
