//! Reset and flash session state machine.
//!
//! A session validates the optional firmware image, finds the reset interface
//! of the device, asks it to reboot into its UF2 bootloader and, when there is
//! an image, waits for the bootloader volume and copies the image onto it.
//!
//! The following state diagram summarizes the different states and
//! transitions a session goes through. Any state may also end in `Failed` on
//! an unrecoverable condition, and in `Aborted` when cancelled.
//!
//! ```text
//!                            START
//!                              |
//!                              v
//!                          .-------.
//!                          | Idle  |
//!                          '-------'
//!                              |
//!                 yes    .-----------.   no
//!              .--------( firmware?   )--------.
//!              v         '-----------'         |
//!     .-----------------.                      |
//!     | ValidatingImage |---- invalid ---> Failed
//!     '-----------------'                      |
//!              |                               v
//!              '--------------------> .----------------.  nowait
//!                                     | SearchingDevice |---------> Failed
//!                                     '----------------'
//!                                        |   ^    |
//!                                        |   '----' not found (0.5s)
//!                                        v
//!                                  .-------------.
//!                                  | DeviceFound |
//!                                  '-------------'
//!                                        |
//!                                        v
//!                                  .-----------.     no firmware
//!                                  | Resetting |-----------------> Done
//!                                  '-----------'
//!                                        |
//!                                        v
//!                              .-------------------.   timeout
//!                              | WaitingBootloader |-------------> Failed
//!                              '-------------------'
//!                                        |
//!                                        v
//!                                  .----------.    copy error
//!                                  | Flashing |------------------> Failed
//!                                  '----------'
//!                                        |
//!                                        v
//!                                      Done
//! ```

use super::{environment::Environment, events::*, states::*};
use crate::{error::Error, settings::Settings};

// =============================================================================
// Public Interface
// =============================================================================

/// How a session ended.
#[derive(Debug)]
pub enum Outcome {
    Done,
    Failed(Error),
    /// Cancelled from outside; nothing else is to be reported.
    Aborted,
}
impl Outcome {
    /// Process exit status for the outcome: only failures are non-zero.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Done | Outcome::Aborted => 0,
            Outcome::Failed(_) => 1,
        }
    }
}

/// A reset/flash session. Use the `factory()` function to get an instance then
/// run it by calling its `run()` method.
pub struct Session<'a> {
    sm: SessionStates,
    env: Environment<'a>,
}
impl<'a> Session<'a> {
    /// The session event loop runs until one of the `Done`, `Failed` or
    /// `Aborted` states is reached and returns the matching [`Outcome`].
    pub fn run(self) -> Outcome {
        let Session { mut sm, env } = self;
        loop {
            sm = match sm {
                SessionStates::Done(_) => return Outcome::Done,
                SessionStates::Failed(sm) => return Outcome::Failed(sm.state.error),
                SessionStates::Aborted(_) => return Outcome::Aborted,
                running => running.step(&env),
            };
        }
    }
}

/// Factory function for the session state machine. The session naturally
/// starts in the `Idle` state.
pub fn factory(settings: Settings, env: Environment<'_>) -> Session<'_> {
    Session {
        sm: SessionStates::Idle(SessionSM::new(settings)),
        env,
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// The raw state machine of a session: the settings shared by all states and
/// the current state with its own data.
#[derive(Debug)]
struct SessionSM<S> {
    settings: Settings,
    state: S,
}
impl<S: Runnable> SessionSM<S> {
    fn run(&mut self, env: &Environment<'_>) -> Event {
        self.state.run(&self.settings, env)
    }
}

/// The session starts in the `IdleState`.
impl SessionSM<IdleState> {
    fn new(settings: Settings) -> Self {
        SessionSM {
            settings,
            state: IdleState {},
        }
    }
}

/// An enum wrapper around the states of the session state machine.
#[derive(Debug)]
enum SessionStates {
    Idle(SessionSM<IdleState>),
    ValidatingImage(SessionSM<ValidatingImageState>),
    SearchingDevice(SessionSM<SearchingDeviceState>),
    DeviceFound(SessionSM<DeviceFoundState>),
    Resetting(SessionSM<ResettingState>),
    WaitingBootloader(SessionSM<WaitingBootloaderState>),
    Flashing(SessionSM<FlashingState>),
    Done(SessionSM<DoneState>),
    Failed(SessionSM<FailedState>),
    Aborted(SessionSM<AbortedState>),
}
impl SessionStates {
    /// The unit of work in the session event loop. It runs the current state
    /// and decides the next transition from the event it returns. State
    /// transitions from events are implemented using the rust `From`/`Into`
    /// pattern, so most state/event mismatches are caught at compile time.
    ///
    /// A cancellation requested while the previous state ran wins over
    /// running the next one.
    fn step(self, env: &Environment<'_>) -> Self {
        if env.cancel.is_cancelled() {
            if let Some(settings) = self.settings() {
                return SessionStates::Aborted(AbortEvent { settings }.into());
            }
        }

        match self {
            SessionStates::Idle(mut sm) => match sm.run(env) {
                Event::ValidateImage(ev) => SessionStates::ValidatingImage(ev.into()),
                Event::SearchDevice(ev) => SessionStates::SearchingDevice(ev.into()),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            SessionStates::ValidatingImage(mut sm) => match sm.run(env) {
                Event::SearchDevice(ev) => SessionStates::SearchingDevice(ev.into()),
                Event::Fail(ev) => SessionStates::Failed(ev.into()),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            SessionStates::SearchingDevice(mut sm) => match sm.run(env) {
                Event::DeviceFound(ev) => SessionStates::DeviceFound(ev.into()),
                Event::Fail(ev) => SessionStates::Failed(ev.into()),
                Event::Abort(ev) => SessionStates::Aborted(ev.into()),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            SessionStates::DeviceFound(mut sm) => match sm.run(env) {
                Event::Reset(ev) => SessionStates::Resetting(ev.into()),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            SessionStates::Resetting(mut sm) => match sm.run(env) {
                Event::WaitBootloader(ev) => SessionStates::WaitingBootloader(ev.into()),
                Event::Done(ev) => SessionStates::Done(ev.into()),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            SessionStates::WaitingBootloader(mut sm) => match sm.run(env) {
                Event::Flash(ev) => SessionStates::Flashing(ev.into()),
                Event::Fail(ev) => SessionStates::Failed(ev.into()),
                Event::Abort(ev) => SessionStates::Aborted(ev.into()),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            SessionStates::Flashing(mut sm) => match sm.run(env) {
                Event::Done(ev) => SessionStates::Done(ev.into()),
                Event::Fail(ev) => SessionStates::Failed(ev.into()),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            terminal => terminal,
        }
    }

    /// Settings of a non-terminal state.
    fn settings(&self) -> Option<Settings> {
        match self {
            SessionStates::Idle(sm) => Some(sm.settings.clone()),
            SessionStates::ValidatingImage(sm) => Some(sm.settings.clone()),
            SessionStates::SearchingDevice(sm) => Some(sm.settings.clone()),
            SessionStates::DeviceFound(sm) => Some(sm.settings.clone()),
            SessionStates::Resetting(sm) => Some(sm.settings.clone()),
            SessionStates::WaitingBootloader(sm) => Some(sm.settings.clone()),
            SessionStates::Flashing(sm) => Some(sm.settings.clone()),
            SessionStates::Done(_) | SessionStates::Failed(_) | SessionStates::Aborted(_) => None,
        }
    }
}

// -----------------------------------------------------------------------------
// State from Event transitions
// -----------------------------------------------------------------------------

impl From<ValidateImageEvent> for SessionSM<ValidatingImageState> {
    fn from(event: ValidateImageEvent) -> SessionSM<ValidatingImageState> {
        SessionSM {
            settings: event.settings,
            state: ValidatingImageState { path: event.path },
        }
    }
}

impl From<SearchDeviceEvent> for SessionSM<SearchingDeviceState> {
    fn from(event: SearchDeviceEvent) -> SessionSM<SearchingDeviceState> {
        SessionSM {
            settings: event.settings,
            state: SearchingDeviceState { image: event.image },
        }
    }
}

impl From<DeviceFoundEvent> for SessionSM<DeviceFoundState> {
    fn from(event: DeviceFoundEvent) -> SessionSM<DeviceFoundState> {
        SessionSM {
            settings: event.settings,
            state: DeviceFoundState {
                image: event.image,
                device: event.device,
                after_waiting: event.after_waiting,
            },
        }
    }
}

impl From<ResetEvent> for SessionSM<ResettingState> {
    fn from(event: ResetEvent) -> SessionSM<ResettingState> {
        SessionSM {
            settings: event.settings,
            state: ResettingState {
                image: event.image,
                device: event.device,
            },
        }
    }
}

impl From<WaitBootloaderEvent> for SessionSM<WaitingBootloaderState> {
    fn from(event: WaitBootloaderEvent) -> SessionSM<WaitingBootloaderState> {
        SessionSM {
            settings: event.settings,
            state: WaitingBootloaderState { image: event.image },
        }
    }
}

impl From<FlashEvent> for SessionSM<FlashingState> {
    fn from(event: FlashEvent) -> SessionSM<FlashingState> {
        SessionSM {
            settings: event.settings,
            state: FlashingState {
                image: event.image,
                volume: event.volume,
            },
        }
    }
}

impl From<DoneEvent> for SessionSM<DoneState> {
    fn from(event: DoneEvent) -> SessionSM<DoneState> {
        SessionSM {
            settings: event.settings,
            state: DoneState {},
        }
    }
}

impl From<FailEvent> for SessionSM<FailedState> {
    fn from(event: FailEvent) -> SessionSM<FailedState> {
        SessionSM {
            settings: event.settings,
            state: FailedState { error: event.error },
        }
    }
}

impl From<AbortEvent> for SessionSM<AbortedState> {
    fn from(event: AbortEvent) -> SessionSM<AbortedState> {
        SessionSM {
            settings: event.settings,
            state: AbortedState {},
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        report::{Reporter, Status},
        settings::{SettingsBuilder, TargetIdentity},
        utils::{
            CancelToken, DeviceHandle, DeviceLocator, FakeClock, FirmwareCopier, FirmwareImage,
            ResetOutcome, ResetTrigger, VolumeLister,
        },
    };
    use std::{
        cell::{Cell, RefCell},
        fs::{self, File},
        io,
        path::{Path, PathBuf},
    };
    use tempfile::TempDir;

    const UF2_HEADER: [u8; 8] = [0x55, 0x46, 0x32, 0x0A, 0x57, 0x51, 0x5D, 0x9E];

    /// Attaches the device at the given lookup, if ever. Optionally cancels
    /// the session at a given lookup instead.
    struct FakeLocator {
        found_at: Option<usize>,
        cancel_at: Option<(usize, CancelToken)>,
        calls: Cell<usize>,
    }
    impl FakeLocator {
        fn found_at(call: usize) -> Self {
            FakeLocator {
                found_at: Some(call),
                cancel_at: None,
                calls: Cell::new(0),
            }
        }

        fn never() -> Self {
            FakeLocator {
                found_at: None,
                cancel_at: None,
                calls: Cell::new(0),
            }
        }
    }
    impl DeviceLocator for FakeLocator {
        fn locate(&self, target: &TargetIdentity) -> Option<DeviceHandle> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if let Some((at, token)) = &self.cancel_at {
                if *at == call {
                    token.cancel();
                }
            }
            if self.found_at == Some(call) {
                Some(DeviceHandle {
                    path: "/dev/ttyACM0".into(),
                    target: *target,
                })
            } else {
                None
            }
        }
    }

    struct FakeReset {
        outcome: ResetOutcome,
        calls: Cell<usize>,
    }
    impl FakeReset {
        fn new(outcome: ResetOutcome) -> Self {
            FakeReset {
                outcome,
                calls: Cell::new(0),
            }
        }
    }
    impl ResetTrigger for FakeReset {
        fn trigger(&self, device: &DeviceHandle) -> ResetOutcome {
            assert_eq!(device.path, "/dev/ttyACM0");
            self.calls.set(self.calls.get() + 1);
            self.outcome.clone()
        }
    }

    /// A single volume which gets the bootloader marker at the given
    /// enumeration.
    struct FakeVolumes {
        volume: TempDir,
        appears_at: Option<usize>,
        cancel_at: Option<(usize, CancelToken)>,
        calls: Cell<usize>,
    }
    impl FakeVolumes {
        fn appearing_at(call: Option<usize>) -> Self {
            FakeVolumes {
                volume: tempfile::tempdir().unwrap(),
                appears_at: call,
                cancel_at: None,
                calls: Cell::new(0),
            }
        }
    }
    impl VolumeLister for FakeVolumes {
        fn mounted_volumes(&self) -> io::Result<Vec<PathBuf>> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if let Some((at, token)) = &self.cancel_at {
                if *at == call {
                    token.cancel();
                }
            }
            if self.appears_at == Some(call) {
                File::create(self.volume.path().join("INFO_UF2.TXT"))?;
            }
            Ok(vec![self.volume.path().to_owned()])
        }
    }

    struct RecordingCopier {
        fail: bool,
        calls: RefCell<Vec<(PathBuf, PathBuf)>>,
    }
    impl RecordingCopier {
        fn new(fail: bool) -> Self {
            RecordingCopier {
                fail,
                calls: RefCell::new(vec![]),
            }
        }
    }
    impl FirmwareCopier for RecordingCopier {
        fn copy(&self, image: &FirmwareImage, volume: &Path) -> crate::error::Result<PathBuf> {
            self.calls
                .borrow_mut()
                .push((image.path.clone(), volume.to_owned()));
            let target = volume.join(image.path.file_name().unwrap());
            if self.fail {
                Err(Error::CopyFailed {
                    target,
                    source: io::Error::new(io::ErrorKind::Other, "volume is read-only"),
                })
            } else {
                Ok(target)
            }
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        seen: RefCell<Vec<&'static str>>,
    }
    impl Reporter for RecordingReporter {
        fn report(&self, status: Status<'_>) {
            let name = match status {
                Status::ImageValidated(_) => "image",
                Status::WaitingForDevice(_) => "waiting-device",
                Status::DeviceFound {
                    after_waiting: false,
                    ..
                } => "device",
                Status::DeviceFound {
                    after_waiting: true,
                    ..
                } => "device-after-wait",
                Status::ResetRequested(_) => "reset",
                Status::WaitingForBootloader => "waiting-bootloader",
                Status::BootloaderFound(_) => "bootloader",
                Status::Flashed(_) => "flashed",
            };
            self.seen.borrow_mut().push(name);
        }
    }

    /// All the fakes of one test, with the knobs the scenarios need.
    struct Fixture {
        locator: FakeLocator,
        reset: FakeReset,
        volumes: FakeVolumes,
        copier: RecordingCopier,
        clock: FakeClock,
        reporter: RecordingReporter,
        cancel: CancelToken,
        supported: bool,
    }
    impl Fixture {
        fn new(locator: FakeLocator, volumes: FakeVolumes) -> Self {
            Fixture {
                locator,
                reset: FakeReset::new(ResetOutcome::ResetLikely(serialport::Error::new(
                    serialport::ErrorKind::NoDevice,
                    "gone",
                ))),
                volumes,
                copier: RecordingCopier::new(false),
                clock: FakeClock::new(),
                reporter: RecordingReporter::default(),
                cancel: CancelToken::new(),
                supported: true,
            }
        }

        fn run(&self, settings: Settings) -> Outcome {
            let env = Environment {
                locator: &self.locator,
                reset: &self.reset,
                volumes: if self.supported {
                    Some(&self.volumes as &dyn VolumeLister)
                } else {
                    None
                },
                copier: &self.copier,
                clock: &self.clock,
                reporter: &self.reporter,
                cancel: self.cancel.clone(),
            };
            factory(settings, env).run()
        }

        fn seen(&self) -> Vec<&'static str> {
            self.reporter.seen.borrow().clone()
        }
    }

    fn firmware(dir: &TempDir, header: &[u8]) -> PathBuf {
        let path = dir.path().join("app.uf2");
        let mut content = header.to_vec();
        content.extend_from_slice(&[0xAB; 504]);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn reset_only_when_no_firmware() {
        let fx = Fixture::new(FakeLocator::found_at(1), FakeVolumes::appearing_at(Some(1)));
        let outcome = fx.run(SettingsBuilder::new().finalize());

        assert!(matches!(outcome, Outcome::Done));
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(fx.locator.calls.get(), 1);
        assert_eq!(fx.reset.calls.get(), 1);
        assert_eq!(fx.volumes.calls.get(), 0);
        assert!(fx.copier.calls.borrow().is_empty());
        assert_eq!(fx.seen(), vec!["device", "reset"]);
    }

    #[test]
    fn invalid_image_fails_before_any_device_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let path = firmware(&dir, &[0; 8]);
        let fx = Fixture::new(FakeLocator::found_at(1), FakeVolumes::appearing_at(Some(1)));
        let outcome = fx.run(SettingsBuilder::new().firmware(&path).finalize());

        match &outcome {
            Outcome::Failed(Error::InvalidFirmwareHeader { path: p }) => assert_eq!(p, &path),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(fx.locator.calls.get(), 0);
        assert_eq!(fx.reset.calls.get(), 0);
    }

    #[test]
    fn unreadable_image_fails_before_any_device_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let fx = Fixture::new(FakeLocator::found_at(1), FakeVolumes::appearing_at(Some(1)));
        let outcome = fx.run(
            SettingsBuilder::new()
                .firmware(dir.path().join("missing.uf2"))
                .finalize(),
        );

        assert!(matches!(
            outcome,
            Outcome::Failed(Error::FirmwareUnreadable { .. })
        ));
        assert_eq!(fx.locator.calls.get(), 0);
    }

    #[test]
    fn fail_fast_without_device() {
        let fx = Fixture::new(FakeLocator::never(), FakeVolumes::appearing_at(None));
        let outcome = fx.run(SettingsBuilder::new().wait_for_device(false).finalize());

        match outcome {
            Outcome::Failed(Error::DeviceNotFound { target }) => {
                assert_eq!(target, TargetIdentity::default())
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(fx.locator.calls.get(), 1);
        assert_eq!(fx.clock.sleeps.get(), 0);
        assert_eq!(fx.reset.calls.get(), 0);
    }

    #[test]
    fn flash_after_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = firmware(&dir, &UF2_HEADER);
        let fx = Fixture::new(FakeLocator::found_at(1), FakeVolumes::appearing_at(Some(2)));
        let outcome = fx.run(SettingsBuilder::new().firmware(&path).finalize());

        assert!(matches!(outcome, Outcome::Done));
        assert_eq!(fx.reset.calls.get(), 1);
        assert_eq!(fx.volumes.calls.get(), 2);
        assert_eq!(
            *fx.copier.calls.borrow(),
            vec![(path, fx.volumes.volume.path().to_owned())]
        );
        assert_eq!(
            fx.seen(),
            vec![
                "image",
                "device",
                "reset",
                "waiting-bootloader",
                "bootloader",
                "flashed"
            ]
        );
    }

    #[test]
    fn waits_for_the_device_to_be_connected() {
        let fx = Fixture::new(FakeLocator::found_at(4), FakeVolumes::appearing_at(None));
        let outcome = fx.run(SettingsBuilder::new().finalize());

        assert!(matches!(outcome, Outcome::Done));
        assert_eq!(fx.locator.calls.get(), 4);
        assert_eq!(fx.clock.sleeps.get(), 2);
        assert_eq!(fx.seen(), vec!["waiting-device", "device-after-wait", "reset"]);
    }

    #[test]
    fn uncertain_reset_still_flashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = firmware(&dir, &UF2_HEADER);
        let mut fx = Fixture::new(FakeLocator::found_at(1), FakeVolumes::appearing_at(Some(1)));
        fx.reset = FakeReset::new(ResetOutcome::ResetUncertain);
        let outcome = fx.run(SettingsBuilder::new().firmware(&path).finalize());

        assert!(matches!(outcome, Outcome::Done));
        assert_eq!(fx.copier.calls.borrow().len(), 1);
    }

    #[test]
    fn bootloader_never_showing_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = firmware(&dir, &UF2_HEADER);
        let fx = Fixture::new(FakeLocator::found_at(1), FakeVolumes::appearing_at(None));
        let outcome = fx.run(SettingsBuilder::new().firmware(&path).finalize());

        match outcome {
            Outcome::Failed(Error::BootloaderTimeout { waited }) => {
                assert_eq!(waited, std::time::Duration::from_secs(5))
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(fx.volumes.calls.get(), 10);
        assert!(fx.copier.calls.borrow().is_empty());
    }

    #[test]
    fn unsupported_platform_fails_without_polling() {
        let dir = tempfile::tempdir().unwrap();
        let path = firmware(&dir, &UF2_HEADER);
        let mut fx = Fixture::new(FakeLocator::found_at(1), FakeVolumes::appearing_at(Some(1)));
        fx.supported = false;
        let outcome = fx.run(SettingsBuilder::new().firmware(&path).finalize());

        assert!(matches!(outcome, Outcome::Failed(Error::UnsupportedPlatform)));
        assert_eq!(fx.reset.calls.get(), 1);
        assert_eq!(fx.volumes.calls.get(), 0);
        assert_eq!(fx.clock.sleeps.get(), 0);
    }

    #[test]
    fn copy_failure_is_final() {
        let dir = tempfile::tempdir().unwrap();
        let path = firmware(&dir, &UF2_HEADER);
        let mut fx = Fixture::new(FakeLocator::found_at(1), FakeVolumes::appearing_at(Some(1)));
        fx.copier = RecordingCopier::new(true);
        let outcome = fx.run(SettingsBuilder::new().firmware(&path).finalize());

        match outcome {
            Outcome::Failed(e @ Error::CopyFailed { .. }) => {
                let source = std::error::Error::source(&e).unwrap();
                assert_eq!(source.to_string(), "volume is read-only");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(fx.copier.calls.borrow().len(), 1);
    }

    #[test]
    fn cancelled_while_waiting_for_the_device() {
        let mut fx = Fixture::new(FakeLocator::never(), FakeVolumes::appearing_at(None));
        fx.locator.cancel_at = Some((3, fx.cancel.clone()));
        let outcome = fx.run(SettingsBuilder::new().finalize());

        assert!(matches!(outcome, Outcome::Aborted));
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(fx.locator.calls.get(), 3);
        assert_eq!(fx.reset.calls.get(), 0);
    }

    #[test]
    fn cancelled_while_waiting_for_the_bootloader() {
        let dir = tempfile::tempdir().unwrap();
        let path = firmware(&dir, &UF2_HEADER);
        let mut fx = Fixture::new(FakeLocator::found_at(1), FakeVolumes::appearing_at(None));
        fx.volumes.cancel_at = Some((2, fx.cancel.clone()));
        let outcome = fx.run(SettingsBuilder::new().firmware(&path).finalize());

        assert!(matches!(outcome, Outcome::Aborted));
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(fx.reset.calls.get(), 1);
        assert_eq!(fx.volumes.calls.get(), 2);
        assert!(fx.copier.calls.borrow().is_empty());
        assert_eq!(fx.seen(), vec!["image", "device", "reset", "waiting-bootloader"]);
    }

    #[test]
    fn cancelled_before_starting() {
        let fx = Fixture::new(FakeLocator::found_at(1), FakeVolumes::appearing_at(None));
        fx.cancel.cancel();
        let outcome = fx.run(SettingsBuilder::new().finalize());

        assert!(matches!(outcome, Outcome::Aborted));
        assert_eq!(fx.locator.calls.get(), 0);
    }
}
