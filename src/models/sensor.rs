use crate::models::{
    common::{KinematicState, Vector3, constants},
    traits::ISensor,
};
use crate::scenario::SensorType;

/// 位置観測値（極座標）
///
/// 角度はすべてラジアン。方位角は右が正、仰角は上が正。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionOutput {
    /// 距離（m）
    pub range: f64,
    /// 方位角（rad）
    pub azimuth: f64,
    /// 仰角（rad）
    pub elevation: f64,
}

/// 速度観測値（極座標）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityOutput {
    /// 距離変化率（m/s、遠ざかる方向が正）
    pub range: f64,
    /// 方位角変化率（rad/s）
    pub azimuth: f64,
    /// 仰角変化率（rad/s）
    pub elevation: f64,
}

/// センサー出力
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorOutput {
    pub position: PositionOutput,
    pub velocity: VelocityOutput,
}

/// 理想センサー
///
/// ノイズ・遅延なしで真値を返します。
#[derive(Debug, Clone, Copy, Default)]
pub struct IdealSensor;

impl IdealSensor {
    /// 相対位置の観測
    ///
    /// # 引数
    ///
    /// * `observer` - 観測者の運動状態（機体座標系を使用）
    /// * `target` - 目標の運動状態
    ///
    /// # 戻り値
    ///
    /// 距離・方位角・仰角。距離が0の場合は角度も0。
    pub fn sense_position(&self, observer: &KinematicState, target: &KinematicState) -> PositionOutput {
        let relative = target.position - observer.position;
        let range = relative.magnitude();
        if range < constants::EPSILON {
            return PositionOutput::default();
        }

        let frame = &observer.frame;
        let horizontal = relative.project_on_plane(&frame.up);
        let azimuth = relative.dot(&frame.right).atan2(relative.dot(&frame.forward));
        let elevation = relative.dot(&frame.up).atan2(horizontal.magnitude());

        PositionOutput { range, azimuth, elevation }
    }

    /// 相対速度の観測
    ///
    /// 相対速度を視線方向成分（距離変化率）と接線成分に分け、
    /// 接線成分を右・上軸に分解して距離で割ったものを角速度とします。
    pub fn sense_velocity(&self, observer: &KinematicState, target: &KinematicState) -> VelocityOutput {
        let relative = target.position - observer.position;
        let range = relative.magnitude();
        if range < constants::EPSILON {
            return VelocityOutput::default();
        }

        let line_of_sight = relative / range;
        let relative_velocity = target.velocity - observer.velocity;
        let range_rate = relative_velocity.dot(&line_of_sight);
        let tangential: Vector3 = relative_velocity - line_of_sight * range_rate;

        VelocityOutput {
            range: range_rate,
            azimuth: tangential.dot(&observer.frame.right) / range,
            elevation: tangential.dot(&observer.frame.up) / range,
        }
    }
}

impl ISensor for IdealSensor {
    fn sense(&self, observer: &KinematicState, target: &KinematicState) -> SensorOutput {
        SensorOutput {
            position: self.sense_position(observer, target),
            velocity: self.sense_velocity(observer, target),
        }
    }
}

/// 搭載センサーモデル
#[derive(Debug, Clone, Copy)]
pub enum SensorModel {
    Ideal(IdealSensor),
}

impl SensorModel {
    pub fn from_type(sensor_type: SensorType) -> Self {
        match sensor_type {
            SensorType::Ideal => SensorModel::Ideal(IdealSensor),
        }
    }
}

impl Default for SensorModel {
    fn default() -> Self {
        SensorModel::Ideal(IdealSensor)
    }
}

impl ISensor for SensorModel {
    fn sense(&self, observer: &KinematicState, target: &KinematicState) -> SensorOutput {
        match self {
            SensorModel::Ideal(sensor) => sensor.sense(observer, target),
        }
    }
}

/// サンプリング周期付きの観測キャッシュ
///
/// 周波数に応じた周期でのみセンサーを更新し、それ以外は前回値を返します。
#[derive(Debug, Clone, Copy, Default)]
pub struct SampledSensor {
    timer: f64,
    last_output: Option<SensorOutput>,
}

impl SampledSensor {
    /// 経過時間を進め、周期に達していれば再観測
    ///
    /// # 引数
    ///
    /// * `frequency` - 観測周波数（Hz）。0以下なら毎ティック観測。
    pub fn update(
        &mut self,
        sensor: &impl ISensor,
        frequency: f64,
        dt: f64,
        observer: &KinematicState,
        target: &KinematicState,
    ) -> SensorOutput {
        let period = if frequency > 0.0 { 1.0 / frequency } else { 0.0 };
        self.timer += dt;

        match self.last_output {
            Some(output) if self.timer < period => output,
            _ => {
                let output = sensor.sense(observer, target);
                self.last_output = Some(output);
                self.timer = 0.0;
                output
            }
        }
    }

    pub fn last_output(&self) -> Option<SensorOutput> {
        self.last_output
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
