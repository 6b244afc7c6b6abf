pub mod pcm_buffer;
