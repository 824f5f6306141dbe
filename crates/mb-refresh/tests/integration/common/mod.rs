pub mod mock_source;
