use clap::Parser;
use embassy_executor::{Executor, Spawner};
use embassy_time::{Duration, Instant, Timer};
use static_cell::StaticCell;
use std::convert::Infallible;
use sweep_core::mk_static;
use sweep_core::utils::controllers::sweep::{ServoOutput, SweepServo, SweepSpeed, SweepState};
use sweep_core::utils::controllers::{SERVO_CHANNEL, ServoCommand, ServoController};
use sweep_core::utils::math::calib::PulseCalibration;
use sweep_core::utils::sched::Scheduler;
use sweep_core::utils::time::SystemClock;
use tracing::info;
use tracing_subscriber;

/// Bank capacity of the emulated controller.
const MAX_SERVOS: usize = 4;

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// number of servos to emulate
    #[clap(long, default_value_t = 1)]
    servos: u8,
    /// scheduler dispatch period in milliseconds
    #[clap(long, default_value_t = 25)]
    period_ms: u64,
    /// startup angle the calibration sweep settles on
    #[clap(long, default_value_t = 0.0)]
    home: f32,
    /// raw JSON command to play, repeatable,
    /// e.g. '{"sc":"s","ch":0,"a":90.0,"d":18.0,"ms":50}'
    #[clap(long)]
    cmd: Vec<String>,
    /// gap between scripted commands in milliseconds
    #[clap(long, default_value_t = 1000)]
    gap_ms: u64,
}

/// Servo output that logs pulses to the console instead of driving PWM.
struct SerialServo {
    channel: u8,
}

impl ServoOutput for SerialServo {
    type Error = Infallible;

    fn enable(&mut self) -> Result<(), Self::Error> {
        info!(channel = self.channel, "servo output enabled");
        Ok(())
    }

    fn write_pulse(&mut self, pulse_us: u16) -> Result<(), Self::Error> {
        info!(channel = self.channel, pulse_us, "servo pulse");
        Ok(())
    }
}

fn log_transition(state: SweepState) {
    info!(?state, "servo transition");
}

#[embassy_executor::task]
async fn control_task(
    ctrl: &'static mut ServoController<SerialServo, MAX_SERVOS>,
    period: Duration,
) -> ! {
    let mut sched: Scheduler<'_, 2> = Scheduler::new();
    sched.add(ctrl, period).unwrap();
    loop {
        sched.poll(Instant::now());
        Timer::after(Duration::from_millis(5)).await;
    }
}

#[embassy_executor::task]
async fn script_task(commands: Vec<ServoCommand>, gap: Duration) {
    for command in commands {
        SERVO_CHANNEL.send(command).await;
        Timer::after(gap).await;
    }
    loop {
        SERVO_CHANNEL.send(ServoCommand::Q { ch: 0 }).await;
        Timer::after(Duration::from_secs(5)).await;
    }
}

#[embassy_executor::task]
async fn main_task(spawner: Spawner) {
    let opts: Opts = Opts::parse();

    let mut ctrl: ServoController<SerialServo, MAX_SERVOS> = ServoController::new();
    for channel in 0..opts.servos.min(MAX_SERVOS as u8) {
        let mut servo = SweepServo::new(PulseCalibration::sg90());
        servo.attach(SerialServo { channel }).unwrap();
        servo.set_speed(SweepSpeed::per(18.0, Duration::from_millis(50)));
        servo.on_transition(log_transition);

        // Blocking calibration runs once, before the scheduler starts.
        info!(channel, "calibrating servo");
        servo.initialize(&SystemClock, opts.home).unwrap();

        if ctrl.push(servo).is_err() {
            panic!("servo bank full");
        }
    }

    let commands: Vec<ServoCommand> = if opts.cmd.is_empty() {
        vec![
            ServoCommand::S {
                ch: 0,
                a: 90.0,
                d: Some(18.0),
                ms: Some(50),
            },
            ServoCommand::S {
                ch: 0,
                a: 0.0,
                d: None,
                ms: None,
            },
            ServoCommand::Q { ch: 0 },
        ]
    } else {
        opts.cmd
            .iter()
            .map(|raw| serde_json::from_str(raw).expect("invalid command JSON"))
            .collect()
    };

    info!("starting scheduler at {}ms dispatch period", opts.period_ms);
    let ctrl = mk_static!(ServoController<SerialServo, MAX_SERVOS>, ctrl);
    spawner
        .spawn(control_task(ctrl, Duration::from_millis(opts.period_ms)))
        .unwrap();
    spawner
        .spawn(script_task(commands, Duration::from_millis(opts.gap_ms)))
        .unwrap();
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(main_task(spawner)).unwrap();
    });
}
