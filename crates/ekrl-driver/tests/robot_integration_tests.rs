//! 端到端集成测试
//!
//! 用回环 `TcpListener` 扮演控制器的两个端点，验证从会话 API 到
//! 线上字节的完整链路：指令 Id 序列、文档内容、遥测缓存、安全
//! 通道独立性。

use ekrl_driver::{ChannelSink, MoveParams, RobotBuilder};
use ekrl_protocol::Pose;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const STATE_DOC: &str = concat!(
    "<RobotState>",
    "<Cartesian X=\"512.5\" Y=\"-80\" Z=\"301.25\" A=\"0\" B=\"90\" C=\"180\"/>",
    "<Joint A1=\"10\" A2=\"20\" A3=\"30\" A4=\"40\" A5=\"50\" A6=\"60\"/>",
    "</RobotState>",
);

/// 回环端点：接受一个连接，可选地先发一段遥测，然后收集对方发来
/// 的全部字节，直到对方关闭连接。
struct MockEndpoint {
    port: u16,
    received: Arc<Mutex<Vec<u8>>>,
    handle: thread::JoinHandle<()>,
}

fn spawn_endpoint(telemetry: Option<&'static str>) -> MockEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();

    let handle = thread::spawn(move || {
        let (mut conn, _) = listener.accept().unwrap();
        conn.set_read_timeout(Some(Duration::from_millis(20))).unwrap();
        if let Some(t) = telemetry {
            conn.write_all(t.as_bytes()).unwrap();
        }
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut buf = [0u8; 4096];
        while Instant::now() < deadline {
            match conn.read(&mut buf) {
                Ok(0) => break, // 对方关闭
                Ok(n) => sink.lock().unwrap().extend_from_slice(&buf[..n]),
                Err(_) => {} // 读超时，继续等
            }
        }
    });

    MockEndpoint {
        port,
        received,
        handle,
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn wait_for<T>(mut f: impl FnMut() -> Option<T>) -> T {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if let Some(v) = f() {
            return v;
        }
        assert!(Instant::now() < deadline, "condition not met within deadline");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_move_ids_and_document_content_end_to_end() {
    init_tracing();
    let motion = spawn_endpoint(Some(STATE_DOC));
    let meta = spawn_endpoint(None);

    let (sink, joints_rx) = ChannelSink::new(16);
    let robot = RobotBuilder::new("127.0.0.1")
        .motion_port(motion.port)
        .meta_port(meta.port)
        .receive_timeout(Duration::from_millis(20))
        .add_joint_sink(Arc::new(sink))
        .build()
        .unwrap();
    assert!(robot.is_healthy());

    let pose = Pose::unnamed(100.0, 200.0, 300.0, 0.0, 90.0, 180.0);
    let params = MoveParams {
        velocity: 0.2,
        ..MoveParams::default()
    };
    assert_eq!(robot.motion().send_move(&pose, &params).unwrap(), 1);
    assert_eq!(robot.motion().send_move(&pose, &params).unwrap(), 2);

    // 安全通道与运动指令并发可用，钳制在发送前完成
    robot.safety().set_override(1.5).unwrap();

    // 遥测经读线程 → 帧重组 → 解码 → 回调/状态单元
    let joints = joints_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(joints.a1, 10.0);
    let pose_now = wait_for(|| robot.motion().current_pose("now").ok());
    assert_eq!(pose_now.x, 512.5);
    assert_eq!(pose_now.name, "now");

    // 关停：读线程退出、连接关闭，端点线程随之结束
    robot.shutdown();
    motion.handle.join().unwrap();
    meta.handle.join().unwrap();

    let motion_wire = String::from_utf8(motion.received.lock().unwrap().clone()).unwrap();
    assert!(motion_wire.contains("Id=\"1\""));
    assert!(motion_wire.contains("Type=\"1\""));
    assert!(motion_wire.contains("X=\"100\""));
    assert!(motion_wire.contains("Y=\"200\""));
    assert!(motion_wire.contains("Z=\"300\""));
    assert!(motion_wire.contains("B=\"90\""));
    assert!(motion_wire.contains("C=\"180\""));
    assert!(motion_wire.contains("Velocity=\"0.2\""));
    assert!(motion_wire.contains("Id=\"2\""));

    let meta_wire = String::from_utf8(meta.received.lock().unwrap().clone()).unwrap();
    assert!(meta_wire.contains("VelocityOverride=\"1\" AbortCommands=\"0\""));
}

#[test]
fn test_sequence_and_abort_end_to_end() {
    init_tracing();
    let motion = spawn_endpoint(None);
    let meta = spawn_endpoint(None);

    let robot = RobotBuilder::new("127.0.0.1")
        .motion_port(motion.port)
        .meta_port(meta.port)
        .receive_timeout(Duration::from_millis(20))
        .build()
        .unwrap();

    let poses = vec![
        Pose::unnamed(1.0, 0.0, 0.0, 0.0, 0.0, 0.0),
        Pose::unnamed(2.0, 0.0, 0.0, 0.0, 0.0, 0.0),
        Pose::unnamed(3.0, 0.0, 0.0, 0.0, 0.0, 0.0),
    ];
    let (first, last) = robot
        .motion()
        .send_sequence(&poses, &MoveParams::default())
        .unwrap();
    assert_eq!((first, last), (1, 3));

    robot.safety().emergency_stop().unwrap();
    robot.safety().reset_abort().unwrap();

    robot.shutdown();
    motion.handle.join().unwrap();
    meta.handle.join().unwrap();

    let motion_wire = String::from_utf8(motion.received.lock().unwrap().clone()).unwrap();
    // 三个文档、三个连续 Id，一次写出
    assert_eq!(motion_wire.matches("<EthernetKRL>").count(), 3);
    assert!(motion_wire.contains("Id=\"1\""));
    assert!(motion_wire.contains("Id=\"2\""));
    assert!(motion_wire.contains("Id=\"3\""));

    let meta_wire = String::from_utf8(meta.received.lock().unwrap().clone()).unwrap();
    assert!(meta_wire.contains("VelocityOverride=\"0\" AbortCommands=\"1\""));
    assert!(meta_wire.contains("VelocityOverride=\"1\" AbortCommands=\"0\""));
}

#[test]
fn test_motion_channel_death_leaves_safety_alive() {
    init_tracing();
    // 运动端点 accept 后立刻关闭连接
    let motion_listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let motion_port = motion_listener.local_addr().unwrap().port();
    let motion_handle = thread::spawn(move || {
        let (conn, _) = motion_listener.accept().unwrap();
        drop(conn);
    });
    let meta = spawn_endpoint(None);

    let robot = RobotBuilder::new("127.0.0.1")
        .motion_port(motion_port)
        .meta_port(meta.port)
        .receive_timeout(Duration::from_millis(20))
        .build()
        .unwrap();
    motion_handle.join().unwrap();

    // 运动通道死亡被读线程观察到
    wait_for(|| (!robot.check_health().0).then_some(()));

    // 安全通道不受影响：独立套接字、独立读线程
    let (_, meta_alive) = robot.check_health();
    assert!(meta_alive);
    robot.safety().set_override(0.5).unwrap();

    robot.shutdown();
    meta.handle.join().unwrap();
}
