//! sluice-core
//!
//! S3 の変更通知をコンテナ単位の起動イベントに変換し、
//! 長時間動き続けるタスクを回収するためのコア部分。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, record, trigger, task, decision, response, errors）
//! - **ports**: 抽象化レイヤー（ObjectStore, EventBus, TaskOrchestrator, IdempotencyStore, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（builder, filter, resolver, dedup, verifier, dispatcher, trigger, reaper_loop）
//! - **impls**: 開発・テスト用の in-memory 実装
//! - **config**: 環境変数からの設定読み込み
//! - **observability**: ログ初期化と run 単位の span

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
