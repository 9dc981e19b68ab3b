//! Test: Install Steps - `uses` actions map to the platform's package manager

use crate::helpers::*;
use orchestrator::core::Platform;

const INSTALLS: &str = r#"
jobs:
  linux:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - name: Install Vulkan
        uses: vendor/install-vulkan@v1
        with:
          packages: libvulkan-dev
          version: "1.3.204"

  macos:
    runs-on: macos-14
    steps:
      - uses: actions/checkout@v4
      - name: Install MoltenVK
        uses: vendor/molten-vk@v2

  windows:
    runs-on: windows-2022
    steps:
      - uses: actions/checkout@v4
      - name: Install Vulkan SDK
        uses: vendor/install-vulkan@v1
        with:
          package: vulkan-sdk
          args: --no-progress
"#;

/// Each platform installs through its own package manager
#[tokio::test]
async fn test_install_uses_platform_package_manager() {
    let runner = MockRunner::new().shared();

    let run = run_workflow_with_mock(INSTALLS, runner.clone()).await;

    assert!(run.is_success());
    assert_eq!(
        runner.commands_on(Platform::Linux),
        ["sudo apt-get install -y --no-install-recommends libvulkan-dev=1.3.204"]
    );
    assert_eq!(runner.commands_on(Platform::Macos), ["brew install molten-vk"]);
    assert_eq!(
        runner.commands_on(Platform::Windows),
        ["choco install vulkan-sdk -y --no-progress"]
    );
}

/// Checkout needs no process and always succeeds
#[tokio::test]
async fn test_builtin_checkout_is_not_invoked() {
    let runner = MockRunner::new().fail_on("checkout", 1).shared();

    let run = run_workflow_with_mock(INSTALLS, runner.clone()).await;

    assert!(run.is_success());
    assert!(!runner.ran("checkout"));
    for result in &run.results {
        assert_eq!(result.steps[0].name, "Run actions/checkout@v4");
        assert_eq!(result.steps[0].exit_code, None);
    }
}

/// Action inputs are also exported as INPUT_ variables
#[tokio::test]
async fn test_inputs_are_exported() {
    let runner = MockRunner::new().shared();

    run_workflow_with_mock(INSTALLS, runner.clone()).await;

    let linux = runner
        .calls()
        .into_iter()
        .find(|c| c.platform == Platform::Linux)
        .unwrap();
    assert_eq!(linux.env.get("INPUT_PACKAGES").map(String::as_str), Some("libvulkan-dev"));
    assert_eq!(linux.env.get("INPUT_VERSION").map(String::as_str), Some("1.3.204"));
}
