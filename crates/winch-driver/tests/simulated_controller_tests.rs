//! 模拟控制器集成测试
//!
//! 使用 `MockCanAdapter` 的应答器模拟一台绞盘控制器：记录转速、启动状态和位置，
//! 按协议回显应答。硬件测试见文件末尾（默认 `#[ignore]`）。

use std::sync::{Arc, Mutex};
use std::time::Duration;
use winch_can::{MockCanAdapter, WinchFrame};
use winch_driver::{Direction, DriverError, JogConfig, Winch, WinchConfig, jog};
use winch_protocol::{Command, format_hex};

#[derive(Debug, Default)]
struct ControllerState {
    rpm: f32,
    running: bool,
    position: f32,
    zero: f32,
    fault: u32,
}

fn value_reply(request: &WinchFrame, value: [u8; 4]) -> WinchFrame {
    let mut data = [0u8; 8];
    data[..2].copy_from_slice(&request.data[..2]);
    data[4..].copy_from_slice(&value);
    WinchFrame::new_standard(0x001, &data)
}

fn simulated_controller(state: Arc<Mutex<ControllerState>>) -> MockCanAdapter {
    MockCanAdapter::new().with_responder(move |frame| {
        let mut s = state.lock().unwrap();
        let command = match Command::decode(frame.data_slice()) {
            Ok(command) => command,
            Err(_) => return Vec::new(),
        };
        let reply = match command {
            Command::Start => {
                s.running = true;
                // 启动后立即"转过" 1 秒
                s.position += s.rpm / 60.0;
                *frame
            },
            Command::Stop => {
                s.running = false;
                *frame
            },
            Command::Turn { rpm, .. } => {
                s.rpm = rpm;
                *frame
            },
            Command::PositionControl { target, .. } => {
                s.position = target;
                *frame
            },
            Command::ReadPosition => value_reply(frame, s.position.to_le_bytes()),
            Command::ReadIq => value_reply(frame, (s.rpm * 0.1).to_le_bytes()),
            Command::ReadZeroPosition => value_reply(frame, s.zero.to_le_bytes()),
            Command::ModifyZeroPosition(value) => {
                s.zero = value;
                *frame
            },
            Command::GetFault => value_reply(frame, s.fault.to_le_bytes()),
        };
        // 总线上的无关帧（其它节点的心跳）
        vec![WinchFrame::new_standard(0x700, &[0x05]), reply]
    })
}

fn winch(state: &Arc<Mutex<ControllerState>>) -> Winch<MockCanAdapter> {
    Winch::with_config(
        simulated_controller(Arc::clone(state)),
        WinchConfig {
            response_timeout: Duration::from_millis(50),
            ..WinchConfig::default()
        },
    )
}

#[test]
fn test_jog_up_emits_captured_frames() {
    let state = Arc::new(Mutex::new(ControllerState {
        position: 10.0,
        ..ControllerState::default()
    }));
    let mut winch = winch(&state);

    let config = JogConfig {
        run_for: Duration::ZERO,
        ..JogConfig::new(Direction::Up)
    };
    let outcome = jog(&mut winch, &config).unwrap();
    assert!(outcome.turn_acknowledged && outcome.start_acknowledged && outcome.hold_acknowledged);

    let sent: Vec<String> = winch
        .adapter()
        .sent_frames()
        .iter()
        .map(|f| format_hex(f.data_slice()))
        .collect();
    assert_eq!(sent[0], "94 00 00 A0 C1 D0 07 00");
    assert_eq!(sent[1], "91 00 00 00 00 00 00 00");
    assert_eq!(sent[2], "B4 13 00 00 00 00 00 00");

    // 保持命令：95 + 位置 f32 + 32 14 00
    let position = 10.0f32 - 20.0 / 60.0;
    let hold = &winch.adapter().sent_frames()[3].data;
    assert_eq!(hold[0], 0x95);
    assert_eq!(&hold[1..5], &position.to_le_bytes());
    assert_eq!(&hold[5..], &[0x32, 0x14, 0x00]);
    assert_eq!(outcome.position, position);
}

#[test]
fn test_jog_down_uses_positive_rpm() {
    let state = Arc::new(Mutex::new(ControllerState::default()));
    let mut winch = winch(&state);

    let config = JogConfig {
        run_for: Duration::ZERO,
        ..JogConfig::new(Direction::Down)
    };
    jog(&mut winch, &config).unwrap();

    let first = winch.adapter().sent_frames()[0];
    assert_eq!(format_hex(first.data_slice()), "94 00 00 A0 41 D0 07 00");
    assert_eq!(state.lock().unwrap().rpm, 20.0);
}

#[test]
fn test_typed_requests_against_controller() {
    let state = Arc::new(Mutex::new(ControllerState {
        fault: 0,
        ..ControllerState::default()
    }));
    let mut winch = winch(&state);

    winch.turn(30.0).unwrap();
    assert!((winch.read_iq().unwrap() - 3.0).abs() < 1e-6);

    winch.modify_zero_position(-2.5).unwrap();
    assert_eq!(winch.read_zero_position().unwrap(), -2.5);

    winch.position_control(4.0, Duration::from_secs(1)).unwrap();
    assert_eq!(winch.read_position().unwrap(), 4.0);

    assert!(winch.get_fault().unwrap().is_ok());

    winch.start().unwrap();
    assert!(state.lock().unwrap().running);
    winch.stop().unwrap();
    assert!(!state.lock().unwrap().running);
}

#[test]
fn test_fault_bits_reported() {
    let state = Arc::new(Mutex::new(ControllerState {
        fault: 0b1000_0001,
        ..ControllerState::default()
    }));
    let mut winch = winch(&state);
    let status = winch.get_fault().unwrap();
    assert!(!status.is_ok());
    assert_eq!(status.active_bits().collect::<Vec<_>>(), vec![0, 7]);
}

#[test]
fn test_silent_controller_times_out() {
    let mut winch = Winch::with_config(
        MockCanAdapter::new(),
        WinchConfig {
            response_timeout: Duration::from_millis(20),
            ..WinchConfig::default()
        },
    );
    assert!(matches!(winch.read_position(), Err(DriverError::Timeout)));
}

/// 真实硬件：读取一次位置（需要 `can0` 已配置为 500 kbit/s）
#[cfg(target_os = "linux")]
#[test]
#[ignore]
fn test_read_position_on_can0() {
    let adapter = winch_can::SocketCanAdapter::new("can0").expect("Failed to open can0");
    let mut winch = Winch::new(adapter);
    let position = winch.read_position().expect("No position reply");
    println!("Position: {position}");
}
