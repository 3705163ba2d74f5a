use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// 3次元ベクトル
///
/// 座標系は x: 右（東）、y: 上（高度）、z: 前方（北）。
/// 位置・速度・加速度のすべてをこの型で表現します。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64, // m (altitude)
    #[serde(default)]
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const RIGHT: Vector3 = Vector3 { x: 1.0, y: 0.0, z: 0.0 };
    pub const UP: Vector3 = Vector3 { x: 0.0, y: 1.0, z: 0.0 };
    pub const FORWARD: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 1.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 内積
    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// 外積
    pub fn cross(&self, other: &Vector3) -> Vector3 {
        Vector3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// ベクトルの長さ
    pub fn magnitude(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// 2点間の3次元距離
    pub fn distance(&self, other: &Vector3) -> f64 {
        (*self - *other).magnitude()
    }

    /// 単位ベクトル化（長さ0の場合はゼロベクトル）
    pub fn normalize(&self) -> Vector3 {
        let mag = self.magnitude();
        if mag > constants::EPSILON {
            *self / mag
        } else {
            Vector3::ZERO
        }
    }

    /// `onto` 方向への射影
    pub fn project_on(&self, onto: &Vector3) -> Vector3 {
        let denom = onto.dot(onto);
        if denom > constants::EPSILON {
            *onto * (self.dot(onto) / denom)
        } else {
            Vector3::ZERO
        }
    }

    /// 法線 `normal` を持つ平面への射影
    pub fn project_on_plane(&self, normal: &Vector3) -> Vector3 {
        *self - self.project_on(normal)
    }

    /// 大きさ制限（最大値でクリップ）
    pub fn clamp_magnitude(&self, max_magnitude: f64) -> Vector3 {
        let max_magnitude = max_magnitude.max(0.0);
        let mag = self.magnitude();
        if mag > max_magnitude {
            *self * (max_magnitude / mag)
        } else {
            *self
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// NaN/Infを含む場合はゼロベクトルに置き換える
    pub fn finite_or_zero(self) -> Vector3 {
        if self.is_finite() { self } else { Vector3::ZERO }
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl AddAssign for Vector3 {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl SubAssign for Vector3 {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Mul<f64> for Vector3 {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Div<f64> for Vector3 {
    type Output = Self;

    fn div(self, scalar: f64) -> Self::Output {
        Self::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
}

impl Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// 機体座標系
///
/// 前方（ロール軸）、右（ピッチ軸）、上（ヨー軸）の3軸で機体の姿勢を表現します。
/// 3軸は常に正規直交です。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyFrame {
    pub forward: Vector3,
    pub right: Vector3,
    pub up: Vector3,
}

impl Default for BodyFrame {
    fn default() -> Self {
        Self {
            forward: Vector3::FORWARD,
            right: Vector3::RIGHT,
            up: Vector3::UP,
        }
    }
}

impl BodyFrame {
    /// 前方ベクトルから機体座標系を構築（ワールド上方向を基準）
    ///
    /// 前方が鉛直に近い場合はワールド右方向をピッチ軸として使用します。
    pub fn from_forward(forward: Vector3) -> Self {
        let forward = forward.normalize();
        if forward == Vector3::ZERO {
            return Self::default();
        }

        let mut right = Vector3::UP.cross(&forward).normalize();
        if right == Vector3::ZERO {
            right = Vector3::RIGHT;
        }
        let up = forward.cross(&right).normalize();

        Self { forward, right, up }
    }

    /// オイラー角（度）から機体座標系を構築
    ///
    /// x: ピッチ（正で機首下げ）、y: ヨー（正で右旋回）、z: ロール。
    /// 回転順序は ロール → ピッチ → ヨー。
    pub fn from_euler_degrees(rotation: Vector3) -> Self {
        let pitch = math_utils::deg_to_rad(rotation.x);
        let yaw = math_utils::deg_to_rad(rotation.y);
        let roll = math_utils::deg_to_rad(rotation.z);

        let rotate = |v: Vector3| -> Vector3 {
            let v = math_utils::rotate_z(v, roll);
            let v = math_utils::rotate_x(v, pitch);
            math_utils::rotate_y(v, yaw)
        };

        Self {
            forward: rotate(Vector3::FORWARD).normalize(),
            right: rotate(Vector3::RIGHT).normalize(),
            up: rotate(Vector3::UP).normalize(),
        }
    }

    /// 速度ベクトルに機軸を合わせる
    ///
    /// 速度が `min_speed` 以下の場合は現在の姿勢を維持します。
    pub fn aligned_with(&self, velocity: Vector3, min_speed: f64) -> Self {
        if velocity.magnitude() > min_speed {
            Self::from_forward(velocity)
        } else {
            *self
        }
    }
}

/// 運動状態
///
/// 運動学プロバイダが積分し、コアは読み取りのみを行います。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KinematicState {
    pub position: Vector3,
    pub velocity: Vector3,
    pub frame: BodyFrame,
}

impl KinematicState {
    pub fn new(position: Vector3, velocity: Vector3, frame: BodyFrame) -> Self {
        Self { position, velocity, frame }
    }

    /// 速度の大きさ（m/s）
    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }

    /// 高度（m）
    pub fn altitude(&self) -> f64 {
        self.position.y
    }
}

/// 物理定数
pub mod constants {
    use super::Vector3;

    /// 標準重力加速度（m/s²）
    pub const GRAVITY: f64 = 9.80665;
    /// 海面上の大気密度（kg/m³）
    pub const AIR_DENSITY_SEA_LEVEL: f64 = 1.204;
    /// 大気密度のスケールハイト（m）
    pub const AIR_DENSITY_SCALE_HEIGHT: f64 = 10_400.0;
    /// 追尾中にこの距離を超えたらミスと判定（m）
    pub const MISS_RANGE_THRESHOLD: f64 = 1000.0;
    /// 機軸を速度に合わせる最小速度（m/s）
    pub const ALIGN_MIN_SPEED: f64 = 0.1;
    pub const EPSILON: f64 = 1e-9;

    /// 重力加速度ベクトル
    pub fn gravity_vector() -> Vector3 {
        Vector3::new(0.0, -GRAVITY, 0.0)
    }
}

/// 数学ユーティリティ関数
pub mod math_utils {
    use super::Vector3;

    /// 度をラジアンに変換
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees.to_radians()
    }

    /// x軸まわりの回転（正で前方が下を向く）
    pub fn rotate_x(v: Vector3, angle: f64) -> Vector3 {
        let (s, c) = angle.sin_cos();
        Vector3::new(v.x, v.y * c - v.z * s, v.y * s + v.z * c)
    }

    /// y軸まわりの回転（正で前方が右を向く）
    pub fn rotate_y(v: Vector3, angle: f64) -> Vector3 {
        let (s, c) = angle.sin_cos();
        Vector3::new(v.x * c + v.z * s, v.y, -v.x * s + v.z * c)
    }

    /// z軸まわりの回転
    pub fn rotate_z(v: Vector3, angle: f64) -> Vector3 {
        let (s, c) = angle.sin_cos();
        Vector3::new(v.x * c - v.y * s, v.x * s + v.y * c, v.z)
    }

    /// 直前 `dt` 秒間の最接近距離
    ///
    /// 相対速度が一定だったとみなし、現在の相対位置から時間を遡って最小距離を求めます。
    ///
    /// # 引数
    ///
    /// * `relative_position` - 現在の相対位置
    /// * `relative_velocity` - 相対速度
    /// * `dt` - 遡る時間（s）
    pub fn closest_approach(relative_position: Vector3, relative_velocity: Vector3, dt: f64) -> f64 {
        let speed_sq = relative_velocity.dot(&relative_velocity);
        if speed_sq <= super::constants::EPSILON || dt <= 0.0 {
            return relative_position.magnitude();
        }
        let back = (relative_position.dot(&relative_velocity) / speed_sq).clamp(0.0, dt);
        (relative_position - relative_velocity * back).magnitude()
    }
}
